use serde::Serialize;

/// Drill-down levels, outermost first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Level {
    Batch,
    Subject,
    Topic,
    Concept,
    Student,
}

impl Level {
    pub const ALL: [Level; 5] = [
        Level::Batch,
        Level::Subject,
        Level::Topic,
        Level::Concept,
        Level::Student,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Level::Batch => "batch",
            Level::Subject => "subject",
            Level::Topic => "topic",
            Level::Concept => "concept",
            Level::Student => "student",
        }
    }

    pub fn parse(raw: &str) -> Option<Level> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "batch" => Some(Level::Batch),
            "subject" => Some(Level::Subject),
            "topic" => Some(Level::Topic),
            "concept" => Some(Level::Concept),
            "student" => Some(Level::Student),
            _ => None,
        }
    }

    /// The level that must already be selected before this one can be.
    /// Students hang off the topic, not the concept: a teacher can open a
    /// student without first picking a concept.
    pub fn required_parent(self) -> Option<Level> {
        match self {
            Level::Batch => None,
            Level::Subject => Some(Level::Batch),
            Level::Topic => Some(Level::Subject),
            Level::Concept => Some(Level::Topic),
            Level::Student => Some(Level::Topic),
        }
    }

    fn below(self) -> impl Iterator<Item = Level> {
        Level::ALL.into_iter().filter(move |l| *l > self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    NoBatch,
    BatchSelected,
    SubjectSelected,
    TopicSelected,
    ConceptSelected,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SelectionError {
    #[error("select a {parent} before choosing a {level}")]
    MissingParent {
        level: &'static str,
        parent: &'static str,
    },
}

/// What a single `select` call did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionChange {
    pub changed: bool,
    pub cleared: Vec<Level>,
    /// Selection as it was before the change; used to find stale cache keys.
    #[serde(skip)]
    pub previous: SelectionState,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionState {
    pub batch_id: Option<i64>,
    pub subject_id: Option<i64>,
    pub topic_id: Option<i64>,
    pub concept_id: Option<i64>,
    pub student_id: Option<i64>,
}

impl SelectionState {
    pub fn get(&self, level: Level) -> Option<i64> {
        match level {
            Level::Batch => self.batch_id,
            Level::Subject => self.subject_id,
            Level::Topic => self.topic_id,
            Level::Concept => self.concept_id,
            Level::Student => self.student_id,
        }
    }

    fn slot_mut(&mut self, level: Level) -> &mut Option<i64> {
        match level {
            Level::Batch => &mut self.batch_id,
            Level::Subject => &mut self.subject_id,
            Level::Topic => &mut self.topic_id,
            Level::Concept => &mut self.concept_id,
            Level::Student => &mut self.student_id,
        }
    }

    /// Write `id` at `level`. Any real change clears every level below it in
    /// the same update; writing the current value again is a no-op.
    pub fn select(
        &mut self,
        level: Level,
        id: Option<i64>,
    ) -> Result<SelectionChange, SelectionError> {
        if id.is_some() {
            if let Some(parent) = level.required_parent() {
                if self.get(parent).is_none() {
                    return Err(SelectionError::MissingParent {
                        level: level.as_str(),
                        parent: parent.as_str(),
                    });
                }
            }
        }

        if self.get(level) == id {
            return Ok(SelectionChange {
                changed: false,
                cleared: Vec::new(),
                previous: self.clone(),
            });
        }

        let previous = self.clone();
        *self.slot_mut(level) = id;
        let mut cleared = Vec::new();
        for lower in level.below() {
            let slot = self.slot_mut(lower);
            if slot.take().is_some() {
                cleared.push(lower);
            }
        }

        Ok(SelectionChange {
            changed: true,
            cleared,
            previous,
        })
    }

    pub fn phase(&self) -> Phase {
        match (
            self.batch_id,
            self.subject_id,
            self.topic_id,
            self.concept_id,
        ) {
            (None, ..) => Phase::NoBatch,
            (Some(_), None, ..) => Phase::BatchSelected,
            (Some(_), Some(_), None, _) => Phase::SubjectSelected,
            (Some(_), Some(_), Some(_), None) => Phase::TopicSelected,
            (Some(_), Some(_), Some(_), Some(_)) => Phase::ConceptSelected,
        }
    }
}
