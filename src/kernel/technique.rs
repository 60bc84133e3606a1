use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::time::bounded_secs;
use crate::error::TechniqueError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PhaseLabel {
    Inhale,
    Hold,
    Exhale,
}

impl PhaseLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseLabel::Inhale => "Inhale",
            PhaseLabel::Hold => "Hold",
            PhaseLabel::Exhale => "Exhale",
        }
    }
}

/// Which way the breathing orb moves during a phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Expand,
    Shrink,
    Hold,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Phase {
    pub label: PhaseLabel,
    #[serde(rename = "duration")]
    pub duration_seconds: f64,
    #[serde(rename = "dir")]
    pub direction: Direction,
}

impl Phase {
    pub const fn new(label: PhaseLabel, duration_seconds: f64, direction: Direction) -> Self {
        Self { label, duration_seconds, direction }
    }

    pub const fn inhale(duration_seconds: f64) -> Self {
        Self::new(PhaseLabel::Inhale, duration_seconds, Direction::Expand)
    }

    pub const fn hold(duration_seconds: f64) -> Self {
        Self::new(PhaseLabel::Hold, duration_seconds, Direction::Hold)
    }

    pub const fn exhale(duration_seconds: f64) -> Self {
        Self::new(PhaseLabel::Exhale, duration_seconds, Direction::Shrink)
    }
}

/// Serialized form of a technique, as written in configuration files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechniqueSpec {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub tagline: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_accent")]
    pub accent: String,
    #[serde(default)]
    pub guided: bool,
    pub phases: Vec<Phase>,
    #[serde(default)]
    pub cues: Vec<String>,
}

fn default_accent() -> String {
    "#5E5CE6".to_string()
}

#[derive(Debug)]
struct TechniqueInner {
    id: String,
    display_name: String,
    tagline: String,
    description: String,
    accent_color: String,
    phases: Vec<Phase>,
    is_guided: bool,
    cues: Vec<String>,
}

/// A validated, immutable breathing pattern. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Technique {
    inner: Arc<TechniqueInner>,
}

impl Technique {
    /// Validates a spec. Empty phase lists and durations that are not a
    /// positive span of at most a week are rejected here so the tick loop
    /// never sees them.
    pub fn from_spec(spec: TechniqueSpec) -> Result<Self, TechniqueError> {
        if spec.phases.is_empty() {
            return Err(TechniqueError::NoPhases(spec.id));
        }
        for (index, phase) in spec.phases.iter().enumerate() {
            let d = phase.duration_seconds;
            if bounded_secs(d).map_or(true, |span| span.is_zero()) {
                return Err(TechniqueError::InvalidDuration { id: spec.id, index, duration: d });
            }
        }

        Ok(Self {
            inner: Arc::new(TechniqueInner {
                id: spec.id,
                display_name: spec.name,
                tagline: spec.tagline,
                description: spec.description,
                accent_color: spec.accent,
                phases: spec.phases,
                is_guided: spec.guided,
                cues: spec.cues,
            }),
        })
    }

    pub fn id(&self) -> &str {
        &self.inner.id
    }

    pub fn display_name(&self) -> &str {
        &self.inner.display_name
    }

    pub fn tagline(&self) -> &str {
        &self.inner.tagline
    }

    pub fn description(&self) -> &str {
        &self.inner.description
    }

    pub fn accent_color(&self) -> &str {
        &self.inner.accent_color
    }

    pub fn phases(&self) -> &[Phase] {
        &self.inner.phases
    }

    /// Never panics: validation guarantees at least one phase.
    pub fn phase(&self, index: usize) -> &Phase {
        let phases = &self.inner.phases;
        &phases[index % phases.len()]
    }

    pub fn is_guided(&self) -> bool {
        self.inner.is_guided
    }

    pub fn cues(&self) -> &[String] {
        &self.inner.cues
    }

    /// Sum of all phase durations, in seconds.
    pub fn cycle_length(&self) -> f64 {
        self.inner.phases.iter().map(|p| p.duration_seconds).sum()
    }
}

/// The set of techniques available to a running engine. Loaded once.
#[derive(Debug, Clone)]
pub struct Catalog {
    techniques: Vec<Technique>,
}

impl Catalog {
    /// Built-ins followed by any extra definitions. Ids must be unique.
    pub fn new(extra: Vec<TechniqueSpec>) -> Result<Self, TechniqueError> {
        let mut techniques: Vec<Technique> = Vec::new();
        for spec in builtin_specs().into_iter().chain(extra) {
            if techniques.iter().any(|t| t.id() == spec.id) {
                return Err(TechniqueError::DuplicateId(spec.id));
            }
            techniques.push(Technique::from_spec(spec)?);
        }
        Ok(Self { techniques })
    }

    pub fn builtin() -> Self {
        let techniques = builtin_specs()
            .into_iter()
            .filter_map(|spec| Technique::from_spec(spec).ok())
            .collect();
        Self { techniques }
    }

    pub fn get(&self, id: &str) -> Result<Technique, TechniqueError> {
        self.techniques
            .iter()
            .find(|t| t.id() == id)
            .cloned()
            .ok_or_else(|| TechniqueError::Unknown(id.to_string()))
    }

    pub fn all(&self) -> &[Technique] {
        &self.techniques
    }

    pub fn default_technique(&self) -> Option<&Technique> {
        self.techniques.first()
    }
}

fn lines(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn builtin_specs() -> Vec<TechniqueSpec> {
    vec![
        TechniqueSpec {
            id: "box".into(),
            name: "Box Breathing".into(),
            tagline: "Calm · Focus · Reset".into(),
            description: "Four equal sides create mental stillness.".into(),
            accent: "#5E5CE6".into(),
            guided: false,
            phases: vec![Phase::inhale(4.0), Phase::hold(4.0), Phase::exhale(4.0), Phase::hold(4.0)],
            cues: lines(&[
                "Keep your gaze on the centre of the orb.",
                "Let your jaw unclench. Let your shoulders drop.",
                "Your only task right now is to stay here.",
                "Notice the stillness between each breath.",
                "You are lowering cortisol with every cycle.",
                "Imagine roots growing down from the base of your spine.",
            ]),
        },
        TechniqueSpec {
            id: "478".into(),
            name: "4 · 7 · 8".into(),
            tagline: "Sleep · Anxiety · Relief".into(),
            description: "The long exhale activates the parasympathetic system.".into(),
            accent: "#30A0C8".into(),
            guided: false,
            phases: vec![Phase::inhale(4.0), Phase::hold(7.0), Phase::exhale(8.0)],
            cues: lines(&[
                "Soften your eyes. Let your gaze go unfocused.",
                "Let any thoughts drift past like clouds.",
                "Feel the weight of your body in the chair.",
                "Your amygdala is quieting right now.",
                "Stay with the orb. Nothing else exists.",
            ]),
        },
        TechniqueSpec {
            id: "coherent".into(),
            name: "Coherent".into(),
            tagline: "Balance · Flow · HRV".into(),
            description: "Five breaths per minute synchronises heart rate variability.".into(),
            accent: "#34C759".into(),
            guided: false,
            phases: vec![Phase::inhale(5.0), Phase::exhale(5.0)],
            cues: lines(&[
                "Gaze at the centre without blinking.",
                "Your heart and breath are becoming one rhythm.",
                "Feel the floor beneath you. You are grounded.",
                "Notice how your body feels heavier each cycle.",
                "Stay present. One breath at a time.",
            ]),
        },
        TechniqueSpec {
            id: "power".into(),
            name: "Power Breath".into(),
            tagline: "Energy · Clarity · Alert".into(),
            description: "Sharp inhale, controlled exhale. A desk-side oxygen boost.".into(),
            accent: "#FF9F0A".into(),
            guided: false,
            phases: vec![Phase::inhale(2.0), Phase::hold(1.0), Phase::exhale(4.0)],
            cues: lines(&[
                "Keep your gaze forward. Stay sharp.",
                "Feel the clarity building in your mind.",
                "Anchor your attention on the centre of the orb.",
                "You are exactly where you need to be.",
            ]),
        },
        TechniqueSpec {
            id: "guided".into(),
            name: "Guided".into(),
            tagline: "Body · Breath · Mind".into(),
            description: "A full guided meditation with voice.".into(),
            accent: "#BF5AF2".into(),
            guided: true,
            phases: vec![Phase::inhale(4.0), Phase::exhale(6.0)],
            cues: lines(&[
                "Let your body be completely still.",
                "Your only job right now is to listen.",
                "Feel the floor or chair beneath you.",
                "Soften your face. Unclench your teeth.",
            ]),
        },
    ]
}
