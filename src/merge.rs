use crate::records::{Concept, PerformanceStatus, Student, TopicRecords};
use std::collections::HashMap;
use tracing::{debug, warn};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergeOutcome {
    pub records: TopicRecords,
    pub matched_concepts: usize,
    pub matched_students: usize,
    pub used_cached_fallback: bool,
}

/// Overwrite placeholder metrics on dropdown concepts with the performance
/// record of the same id. Order and membership follow the dropdown list.
pub fn merge_concepts(dropdown: &[Concept], performance: &[Concept]) -> (Vec<Concept>, usize) {
    let by_id: HashMap<i64, &Concept> = performance.iter().map(|c| (c.concept_id, c)).collect();
    let mut matched = 0;
    let merged = dropdown
        .iter()
        .map(|c| {
            let mut out = c.clone();
            if let Some(p) = by_id.get(&c.concept_id) {
                out.copy_metrics_from(p);
                if out.concept_text.is_empty() {
                    out.concept_text = p.concept_text.clone();
                }
                matched += 1;
            }
            out
        })
        .collect();
    (merged, matched)
}

pub fn merge_students(dropdown: &[Student], performance: &[Student]) -> (Vec<Student>, usize) {
    let by_id: HashMap<i64, &Student> = performance.iter().map(|s| (s.student_id, s)).collect();
    let mut matched = 0;
    let merged = dropdown
        .iter()
        .map(|s| {
            let mut out = s.clone();
            if let Some(p) = by_id.get(&s.student_id) {
                out.copy_metrics_from(p);
                if out.student_name.is_empty() {
                    out.student_name = p.student_name.clone();
                }
                matched += 1;
            }
            out
        })
        .collect();
    (merged, matched)
}

/// When every freshly merged student is all-zero but the cached set for the
/// same key had real numbers, treat the fetch as incomplete and put the cached
/// metrics back for matching ids. Returns whether anything was restored.
///
/// This masks an upstream freshness problem; it does not decide which data
/// is correct.
pub fn restore_zeroed_students(fresh: &mut [Student], cached: &[Student]) -> bool {
    if fresh.is_empty() || fresh.iter().any(|s| s.has_metrics()) {
        return false;
    }
    if !cached.iter().any(|s| s.has_metrics()) {
        return false;
    }

    let by_id: HashMap<i64, &Student> = cached.iter().map(|s| (s.student_id, s)).collect();
    let mut restored = 0;
    for s in fresh.iter_mut() {
        if let Some(c) = by_id.get(&s.student_id) {
            s.copy_metrics_from(c);
            restored += 1;
        }
    }
    restored > 0
}

pub fn reconcile(
    dropdown: &TopicRecords,
    performance: &PerformanceStatus,
    cached: Option<&TopicRecords>,
) -> MergeOutcome {
    let (concepts, matched_concepts) = merge_concepts(&dropdown.concepts, &performance.concepts);
    let (mut students, matched_students) =
        merge_students(&dropdown.students, &performance.students);

    let used_cached_fallback = match cached {
        Some(prev) => restore_zeroed_students(&mut students, &prev.students),
        None => false,
    };
    if used_cached_fallback {
        warn!(
            students = students.len(),
            "fresh student metrics were all zero; restored previously cached values"
        );
    }
    debug!(
        concepts = concepts.len(),
        matched_concepts,
        students = students.len(),
        matched_students,
        "merged topic records"
    );

    MergeOutcome {
        records: TopicRecords { concepts, students },
        matched_concepts,
        matched_students,
        used_cached_fallback,
    }
}
