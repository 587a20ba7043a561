use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// Backend payloads are loosely typed: ids and counts arrive as numbers, numeric
// strings or null depending on the endpoint. Everything below normalizes at
// the boundary so the rest of the crate only sees plain numbers.

fn lenient_i64<'de, D>(d: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<Value>::deserialize(d)?;
    Ok(match v {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f.trunc() as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => {
            let t = s.trim();
            t.parse::<i64>()
                .ok()
                .or_else(|| t.parse::<f64>().ok().map(|f| f.trunc() as i64))
                .unwrap_or(0)
        }
        Some(Value::Bool(b)) => i64::from(b),
        _ => 0,
    })
}

fn lenient_f64<'de, D>(d: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<Value>::deserialize(d)?;
    let f = match v {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    Ok(if f.is_finite() { f } else { 0.0 })
}

fn lenient_opt_i64<'de, D>(d: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<Value>::deserialize(d)?;
    Ok(match v {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    })
}

fn lenient_string<'de, D>(d: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<Value>::deserialize(d)?;
    Ok(match v {
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    })
}

fn lenient_string_list<'de, D>(d: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<Value>::deserialize(d)?;
    Ok(match v {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
                Value::Object(map) => map
                    .get("concept_text")
                    .or_else(|| map.get("concept_name"))
                    .or_else(|| map.get("name"))
                    .and_then(|v| v.as_str())
                    .map(|s| s.trim().to_string()),
                _ => None,
            })
            .collect(),
        Some(Value::String(s)) => s
            .split(',')
            .map(|p| p.trim())
            .filter(|p| !p.is_empty())
            .map(|p| p.to_string())
            .collect(),
        _ => Vec::new(),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Student,
    #[default]
    Teacher,
    Principal,
}

impl Role {
    pub fn parse(raw: &str) -> Option<Role> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "student" => Some(Role::Student),
            "teacher" => Some(Role::Teacher),
            "principal" => Some(Role::Principal),
            _ => None,
        }
    }
}

/// Null, missing or unrecognised roles fall back to the default role.
fn lenient_role<'de, D>(d: D) -> Result<Role, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<Value>::deserialize(d)?;
    Ok(match v {
        Some(Value::String(s)) => Role::parse(&s).unwrap_or_default(),
        _ => Role::default(),
    })
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all(serialize = "camelCase"))]
pub struct AuthUser {
    #[serde(alias = "id", deserialize_with = "lenient_i64")]
    pub user_id: i64,
    #[serde(alias = "name", alias = "username", deserialize_with = "lenient_string")]
    pub user_name: String,
    #[serde(alias = "user_type", deserialize_with = "lenient_role")]
    pub role: Role,
    #[serde(alias = "org", deserialize_with = "lenient_string")]
    pub org_code: String,
    #[serde(alias = "access_token", skip_serializing)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all(serialize = "camelCase"))]
pub struct Batch {
    #[serde(alias = "id", deserialize_with = "lenient_i64")]
    pub batch_id: i64,
    #[serde(alias = "name", deserialize_with = "lenient_string")]
    pub batch_name: String,
    #[serde(alias = "grade", alias = "branch", deserialize_with = "lenient_string")]
    pub grade_label: String,
    #[serde(alias = "students_count", alias = "total_students", deserialize_with = "lenient_i64")]
    pub student_count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all(serialize = "camelCase"))]
pub struct Subject {
    #[serde(alias = "id", deserialize_with = "lenient_i64")]
    pub subject_id: i64,
    #[serde(alias = "name", deserialize_with = "lenient_string")]
    pub subject_name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all(serialize = "camelCase"))]
pub struct Topic {
    #[serde(alias = "id", deserialize_with = "lenient_i64")]
    pub topic_id: i64,
    #[serde(alias = "name", deserialize_with = "lenient_string")]
    pub topic_name: String,
    #[serde(deserialize_with = "lenient_i64")]
    pub subject_id: i64,
}

/// Concept with its performance metrics. The metric fields are placeholders
/// (zero) until performance data for the concept's topic has been merged in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all(serialize = "camelCase"))]
pub struct Concept {
    #[serde(alias = "id", deserialize_with = "lenient_i64")]
    pub concept_id: i64,
    #[serde(alias = "concept_name", alias = "name", deserialize_with = "lenient_string")]
    pub concept_text: String,
    #[serde(deserialize_with = "lenient_i64")]
    pub topic_id: i64,
    #[serde(alias = "attended", alias = "students_attended", deserialize_with = "lenient_i64")]
    pub attended_count: i64,
    #[serde(alias = "cleared", alias = "students_cleared", deserialize_with = "lenient_i64")]
    pub cleared_count: i64,
    #[serde(alias = "avg_marks", deserialize_with = "lenient_f64")]
    pub average_marks: f64,
    #[serde(alias = "avg_duration", alias = "duration", deserialize_with = "lenient_f64")]
    pub average_duration_secs: f64,
    #[serde(alias = "total_question_count", deserialize_with = "lenient_i64")]
    pub total_questions: i64,
    #[serde(alias = "attempted_question_count", deserialize_with = "lenient_i64")]
    pub attempted_questions: i64,
}

impl Concept {
    pub fn has_metrics(&self) -> bool {
        self.attended_count != 0
            || self.cleared_count != 0
            || self.average_marks != 0.0
            || self.average_duration_secs != 0.0
            || self.total_questions != 0
            || self.attempted_questions != 0
    }

    pub fn copy_metrics_from(&mut self, other: &Concept) {
        self.attended_count = other.attended_count;
        self.cleared_count = other.cleared_count;
        self.average_marks = other.average_marks;
        self.average_duration_secs = other.average_duration_secs;
        self.total_questions = other.total_questions;
        self.attempted_questions = other.attempted_questions;
    }
}

/// Student with aggregate metrics; overall or topic-scoped depending on which
/// endpoint produced them last.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all(serialize = "camelCase"))]
pub struct Student {
    #[serde(alias = "id", deserialize_with = "lenient_i64")]
    pub student_id: i64,
    #[serde(alias = "name", alias = "student", deserialize_with = "lenient_string")]
    pub student_name: String,
    #[serde(deserialize_with = "lenient_i64")]
    pub batch_id: i64,
    #[serde(alias = "total", alias = "total_concept_count", deserialize_with = "lenient_i64")]
    pub total_concepts: i64,
    #[serde(alias = "cleared", alias = "cleared_concept_count", deserialize_with = "lenient_i64")]
    pub cleared_concepts: i64,
    #[serde(alias = "weak", alias = "weak_concept_count", deserialize_with = "lenient_i64")]
    pub weak_concepts: i64,
    #[serde(alias = "avg_marks", alias = "marks", deserialize_with = "lenient_f64")]
    pub average_marks: f64,
    #[serde(alias = "weak_concept_list", deserialize_with = "lenient_string_list")]
    pub weak_concept_names: Vec<String>,
}

impl Student {
    pub fn has_metrics(&self) -> bool {
        self.total_concepts != 0
            || self.cleared_concepts != 0
            || self.weak_concepts != 0
            || self.average_marks != 0.0
    }

    pub fn copy_metrics_from(&mut self, other: &Student) {
        self.total_concepts = other.total_concepts;
        self.cleared_concepts = other.cleared_concepts;
        self.weak_concepts = other.weak_concepts;
        self.average_marks = other.average_marks;
        if !other.weak_concept_names.is_empty() {
            self.weak_concept_names = other.weak_concept_names.clone();
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all(serialize = "camelCase"))]
pub struct DropdownData {
    pub batches: Vec<Batch>,
    pub subjects: Vec<Subject>,
    pub concepts: Vec<Concept>,
    pub students: Vec<Student>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all(serialize = "camelCase"))]
pub struct TopicList {
    pub topics: Vec<Topic>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all(serialize = "camelCase"))]
pub struct PerformanceStatus {
    pub concepts: Vec<Concept>,
    pub students: Vec<Student>,
}

/// Concepts and students of one (batch, topic) pair after merging.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicRecords {
    pub concepts: Vec<Concept>,
    pub students: Vec<Student>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all(serialize = "camelCase"))]
pub struct BaselineSection {
    #[serde(alias = "section_name", alias = "subject_name", deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(alias = "avg_score", deserialize_with = "lenient_f64")]
    pub average_score: f64,
    #[serde(alias = "max_marks", alias = "total_marks", deserialize_with = "lenient_f64")]
    pub max_score: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all(serialize = "camelCase"))]
pub struct BaselineStudent {
    #[serde(alias = "id", deserialize_with = "lenient_i64")]
    pub student_id: i64,
    #[serde(alias = "name", deserialize_with = "lenient_string")]
    pub student_name: String,
    #[serde(alias = "marks", alias = "obtained_marks", deserialize_with = "lenient_f64")]
    pub score: f64,
    #[serde(alias = "max_marks", alias = "total_marks", deserialize_with = "lenient_f64")]
    pub max_score: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all(serialize = "camelCase"))]
pub struct BaselineReport {
    #[serde(deserialize_with = "lenient_i64")]
    pub batch_id: i64,
    #[serde(deserialize_with = "lenient_opt_i64")]
    pub student_id: Option<i64>,
    #[serde(alias = "students_count", deserialize_with = "lenient_i64")]
    pub total_students: i64,
    #[serde(alias = "attempted", deserialize_with = "lenient_i64")]
    pub attempted_students: i64,
    #[serde(alias = "avg_score", deserialize_with = "lenient_f64")]
    pub average_score: f64,
    #[serde(alias = "sections_data", alias = "subjects")]
    pub sections: Vec<BaselineSection>,
    #[serde(alias = "student_data")]
    pub students: Vec<BaselineStudent>,
}
