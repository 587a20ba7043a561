use crate::records::{BaselineReport, Concept, Student};
use serde::Serialize;

pub const NO_DATA_MESSAGE: &str = "No data available";

/// 1-decimal rounding used for every rate shown on the dashboards:
/// `Int(10*x + 0.5) / 10`
pub fn round_off_1_decimal(x: f64) -> f64 {
    ((10.0 * x) + 0.5).floor() / 10.0
}

fn mean(values: impl Iterator<Item = f64>) -> f64 {
    let (sum, n) = values.fold((0.0_f64, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        0.0
    } else {
        sum / (n as f64)
    }
}

fn percent(part: f64, whole: f64) -> f64 {
    if whole <= 0.0 {
        0.0
    } else {
        100.0 * part / whole
    }
}

/// Cleared over attended as a percentage, clamped to [0, 100]. Zero when
/// nobody attended, even if the cleared count says otherwise.
pub fn mastery_rate(mean_cleared: f64, mean_attended: f64) -> f64 {
    if mean_attended <= 0.0 {
        return 0.0;
    }
    let rate = mean_cleared / mean_attended.max(1.0) * 100.0;
    round_off_1_decimal(rate.clamp(0.0, 100.0))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Band {
    #[serde(rename = "Outstanding")]
    Outstanding,
    #[serde(rename = "Achiever")]
    Achiever,
    #[serde(rename = "Average")]
    Average,
    #[serde(rename = "Need Improvement")]
    NeedImprovement,
}

impl Band {
    pub const ALL: [Band; 4] = [
        Band::Outstanding,
        Band::Achiever,
        Band::Average,
        Band::NeedImprovement,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Band::Outstanding => "Outstanding",
            Band::Achiever => "Achiever",
            Band::Average => "Average",
            Band::NeedImprovement => "Need Improvement",
        }
    }

    /// The .001 offsets put exact boundary scores in the lower band.
    pub fn for_score(score: f64) -> Band {
        if score >= 75.001 {
            Band::Outstanding
        } else if score >= 50.001 {
            Band::Achiever
        } else if score >= 35.001 {
            Band::Average
        } else {
            Band::NeedImprovement
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicSummary {
    pub concept_count: usize,
    pub mean_attended: f64,
    pub mean_cleared: f64,
    pub mastery_rate: f64,
}

/// `None` for an empty concept list; callers show `NO_DATA_MESSAGE`.
pub fn topic_summary(concepts: &[Concept]) -> Option<TopicSummary> {
    if concepts.is_empty() {
        return None;
    }
    let mean_attended = mean(concepts.iter().map(|c| c.attended_count as f64));
    let mean_cleared = mean(concepts.iter().map(|c| c.cleared_count as f64));
    Some(TopicSummary {
        concept_count: concepts.len(),
        mean_attended: round_off_1_decimal(mean_attended),
        mean_cleared: round_off_1_decimal(mean_cleared),
        mastery_rate: mastery_rate(mean_cleared, mean_attended),
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptRow {
    pub concept_id: i64,
    pub concept_text: String,
    pub attended_count: i64,
    pub cleared_count: i64,
    pub average_marks: f64,
    pub average_duration_secs: f64,
    pub total_questions: i64,
    pub attempted_questions: i64,
    pub mastery_rate: f64,
}

pub fn concept_row(c: &Concept) -> ConceptRow {
    ConceptRow {
        concept_id: c.concept_id,
        concept_text: c.concept_text.clone(),
        attended_count: c.attended_count,
        cleared_count: c.cleared_count,
        average_marks: c.average_marks,
        average_duration_secs: c.average_duration_secs,
        total_questions: c.total_questions,
        attempted_questions: c.attempted_questions,
        mastery_rate: mastery_rate(c.cleared_count as f64, c.attended_count as f64),
    }
}

pub fn student_progress(s: &Student) -> f64 {
    let total = s.total_concepts.max(1) as f64;
    (s.cleared_concepts as f64 / total * 100.0).clamp(0.0, 100.0)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRow {
    pub student_id: i64,
    pub student_name: String,
    pub total_concepts: i64,
    pub cleared_concepts: i64,
    pub weak_concepts: i64,
    pub average_marks: f64,
    pub progress: f64,
    pub band: Band,
    pub weak_concept_names: Vec<String>,
}

pub fn student_row(s: &Student) -> StudentRow {
    StudentRow {
        student_id: s.student_id,
        student_name: s.student_name.clone(),
        total_concepts: s.total_concepts,
        cleared_concepts: s.cleared_concepts,
        weak_concepts: s.weak_concepts,
        average_marks: s.average_marks,
        progress: round_off_1_decimal(student_progress(s)),
        band: Band::for_score(s.average_marks),
        weak_concept_names: s.weak_concept_names.clone(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BandCount {
    pub band: Band,
    pub count: usize,
}

/// Always four entries, in band order, including empty bands.
pub fn band_distribution<'a, I>(bands: I) -> Vec<BandCount>
where
    I: IntoIterator<Item = &'a Band>,
{
    let mut counts = [0usize; 4];
    for b in bands {
        let idx = Band::ALL.iter().position(|x| x == b).unwrap_or(3);
        counts[idx] += 1;
    }
    Band::ALL
        .iter()
        .zip(counts)
        .map(|(band, count)| BandCount { band: *band, count })
        .collect()
}

pub fn class_average_marks(students: &[Student]) -> Option<f64> {
    if students.is_empty() {
        return None;
    }
    Some(round_off_1_decimal(mean(
        students.iter().map(|s| s.average_marks),
    )))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rollup {
    pub topic_count: usize,
    pub topics_with_data: usize,
    pub mean_mastery_rate: f64,
}

/// Roll per-topic summaries into one line. Topics with no data do not pull
/// the mean down.
pub fn rollup<'a, I>(summaries: I) -> Rollup
where
    I: IntoIterator<Item = Option<&'a TopicSummary>>,
{
    let mut topic_count = 0;
    let mut rates = Vec::new();
    for s in summaries {
        topic_count += 1;
        if let Some(s) = s {
            rates.push(s.mastery_rate);
        }
    }
    Rollup {
        topic_count,
        topics_with_data: rates.len(),
        mean_mastery_rate: round_off_1_decimal(mean(rates.into_iter())),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchoolRollup {
    pub batch_count: usize,
    pub batches_with_data: usize,
    pub mean_average_percent: f64,
    pub mean_participation_rate: f64,
}

/// Roll per-batch baseline summaries into one school line. Same rule as
/// `rollup`: batches without data are counted but not averaged.
pub fn school_rollup<'a, I>(summaries: I) -> SchoolRollup
where
    I: IntoIterator<Item = Option<&'a BaselineSummary>>,
{
    let mut batch_count = 0;
    let mut with_data = Vec::new();
    for s in summaries {
        batch_count += 1;
        if let Some(s) = s {
            with_data.push(s);
        }
    }
    SchoolRollup {
        batch_count,
        batches_with_data: with_data.len(),
        mean_average_percent: round_off_1_decimal(mean(
            with_data.iter().map(|s| s.average_percent),
        )),
        mean_participation_rate: round_off_1_decimal(mean(
            with_data.iter().map(|s| s.participation_rate),
        )),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BaselineSectionRow {
    pub name: String,
    pub average_score: f64,
    pub max_score: f64,
    pub percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BaselineStudentRow {
    pub student_id: i64,
    pub student_name: String,
    pub score: f64,
    pub max_score: f64,
    pub percent: f64,
    pub band: Band,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BaselineSummary {
    pub total_students: i64,
    pub attempted_students: i64,
    pub participation_rate: f64,
    pub average_percent: f64,
    pub sections: Vec<BaselineSectionRow>,
    pub students: Vec<BaselineStudentRow>,
    pub bands: Vec<BandCount>,
}

pub fn baseline_summary(report: &BaselineReport) -> Option<BaselineSummary> {
    if report.sections.is_empty() && report.students.is_empty() {
        return None;
    }

    let sections = report
        .sections
        .iter()
        .map(|s| BaselineSectionRow {
            name: s.name.clone(),
            average_score: s.average_score,
            max_score: s.max_score,
            percent: round_off_1_decimal(percent(s.average_score, s.max_score)),
        })
        .collect::<Vec<_>>();

    let students = report
        .students
        .iter()
        .map(|s| {
            let p = percent(s.score, s.max_score);
            BaselineStudentRow {
                student_id: s.student_id,
                student_name: s.student_name.clone(),
                score: s.score,
                max_score: s.max_score,
                percent: round_off_1_decimal(p),
                band: Band::for_score(p),
            }
        })
        .collect::<Vec<_>>();

    let average_percent = if students.is_empty() {
        mean(sections.iter().map(|s| s.percent))
    } else {
        mean(students.iter().map(|s| s.percent))
    };
    let total = if report.total_students > 0 {
        report.total_students
    } else {
        report.students.len() as i64
    };
    let attempted = if report.attempted_students > 0 {
        report.attempted_students
    } else {
        report.students.iter().filter(|s| s.score > 0.0).count() as i64
    };
    let bands = band_distribution(students.iter().map(|s| &s.band));

    Some(BaselineSummary {
        total_students: total,
        attempted_students: attempted,
        participation_rate: round_off_1_decimal(
            percent(attempted as f64, total.max(1) as f64).min(100.0),
        ),
        average_percent: round_off_1_decimal(average_percent),
        sections,
        students,
        bands,
    })
}
