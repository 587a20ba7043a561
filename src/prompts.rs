use crate::calc::{BandCount, StudentRow, TopicSummary};
use crate::llm::{CompletionRequest, Message};

const TUTOR_PERSONA: &str = "You are EeeBee, a friendly AI study buddy for school students \
(grades 1 to 12). Explain step by step in simple language, use short examples, and write \
mathematics in LaTeX between $...$ (inline) or $$...$$ (display).";

const TEACHER_PERSONA: &str = "You are EeeBee, an assistant for school teachers. Be concise, \
practical and specific to the numbers you are given.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    pub fn parse(raw: Option<&str>) -> Option<Difficulty> {
        match raw.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
            None | Some("") | Some("medium") => Some(Difficulty::Medium),
            Some("easy") => Some(Difficulty::Easy),
            Some("hard") => Some(Difficulty::Hard),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

pub fn explain_concept(
    concept: &str,
    grade: Option<&str>,
    student_name: Option<&str>,
) -> CompletionRequest {
    let mut prompt = format!("Explain the concept \"{}\"", concept.trim());
    if let Some(g) = grade.filter(|g| !g.trim().is_empty()) {
        prompt.push_str(&format!(" for a {} student", g.trim()));
    }
    if let Some(n) = student_name.filter(|n| !n.trim().is_empty()) {
        prompt.push_str(&format!(" named {}", n.trim()));
    }
    prompt.push_str(
        ". Start with a one-sentence definition, then a worked example, then two quick \
practice questions with answers.",
    );
    CompletionRequest::user(prompt)
        .with_system(TUTOR_PERSONA)
        .with_temperature(0.4)
        .with_max_tokens(900)
}

pub fn learning_path(student: &StudentRow, topic_name: Option<&str>) -> CompletionRequest {
    let weak = if student.weak_concept_names.is_empty() {
        "none recorded".to_string()
    } else {
        student.weak_concept_names.join(", ")
    };
    let scope = topic_name
        .filter(|t| !t.trim().is_empty())
        .map(|t| format!(" in the topic \"{}\"", t.trim()))
        .unwrap_or_default();
    let prompt = format!(
        "Create a personalised learning path for {name}{scope}.\n\
Cleared concepts: {cleared} of {total}. Average marks: {marks:.1}. Performance band: {band}.\n\
Weak concepts: {weak}.\n\
Order the weak concepts from foundational to advanced. For each give: why it matters, \
one activity, and a short self-check. Finish with a one-week study plan.",
        name = if student.student_name.is_empty() {
            "the student"
        } else {
            student.student_name.as_str()
        },
        scope = scope,
        cleared = student.cleared_concepts,
        total = student.total_concepts,
        marks = student.average_marks,
        band = student.band.label(),
        weak = weak,
    );
    CompletionRequest::user(prompt)
        .with_system(TUTOR_PERSONA)
        .with_temperature(0.5)
        .with_max_tokens(1200)
}

pub fn exam_questions(
    topic_name: &str,
    concepts: &[String],
    count: u32,
    difficulty: Difficulty,
) -> CompletionRequest {
    let concept_list = if concepts.is_empty() {
        "all concepts of the topic".to_string()
    } else {
        concepts.join("; ")
    };
    let prompt = format!(
        "Write {count} {difficulty} exam questions on the topic \"{topic}\" covering: {concepts}.\n\
Number every question. Mix multiple-choice and short-answer. After each question give \
the answer and a one-line explanation. Put each question in its own paragraph separated \
by a blank line.",
        count = count,
        difficulty = difficulty.as_str(),
        topic = topic_name.trim(),
        concepts = concept_list,
    );
    CompletionRequest::user(prompt)
        .with_system(TUTOR_PERSONA)
        .with_temperature(0.7)
        .with_max_tokens(1500)
}

pub fn class_insight(
    topic_name: &str,
    summary: &TopicSummary,
    bands: &[BandCount],
    class_average_marks: Option<f64>,
) -> CompletionRequest {
    let band_lines = bands
        .iter()
        .map(|b| format!("- {}: {}", b.band.label(), b.count))
        .collect::<Vec<_>>()
        .join("\n");
    let average = class_average_marks
        .map(|m| format!("{:.1}", m))
        .unwrap_or_else(|| "n/a".to_string());
    let prompt = format!(
        "Topic: {topic}\nConcepts: {count}\nMean students attended per concept: {attended:.1}\n\
Mean students cleared per concept: {cleared:.1}\nMastery rate: {rate:.1}%\n\
Class average marks: {average}\nStudents per band:\n{bands}\n\n\
Summarise how the class is doing in three bullet points and suggest two concrete \
next steps for the teacher.",
        topic = topic_name.trim(),
        count = summary.concept_count,
        attended = summary.mean_attended,
        cleared = summary.mean_cleared,
        rate = summary.mastery_rate,
        average = average,
        bands = band_lines,
    );
    CompletionRequest::user(prompt)
        .with_system(TEACHER_PERSONA)
        .with_temperature(0.3)
        .with_max_tokens(700)
}

/// Multi-turn chat: prior turns first, then the new user message.
pub fn chat(history: &[Message], message: &str) -> CompletionRequest {
    CompletionRequest::default()
        .with_system(TUTOR_PERSONA)
        .with_messages(history.iter().cloned())
        .with_messages([Message::user(message.trim())])
        .with_temperature(0.6)
        .with_max_tokens(900)
}
