//! Teacher class-overview flow: fetch, merge, cache and aggregate the
//! batch -> subject -> topic -> concept -> student drill-down, plus the
//! principal's school-wide baseline overview.
//!
//! Every fetch is sequential and blocking. Raw responses land in the session
//! caches keyed by the composite ids they were fetched for.

use crate::backend::{
    BackendError, BaselineParams, DataSource, DropdownParams, PerformanceParams, TopicParams,
};
use crate::calc::{
    self, BandCount, BaselineSummary, ConceptRow, Rollup, SchoolRollup, StudentRow, TopicSummary,
};
use crate::merge;
use crate::records::{AuthUser, BaselineReport, DropdownData, Topic, TopicRecords};
use crate::session::{cache_key, SessionContext, SessionError};
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, thiserror::Error)]
pub enum FlowError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("select a {0} first")]
    NotSelected(&'static str),
    #[error("{0} {1} is not part of the selected topic")]
    NotFound(&'static str, i64),
}

impl FlowError {
    pub fn code(&self) -> &'static str {
        match self {
            FlowError::Backend(e) => e.code(),
            FlowError::Session(e) => e.code(),
            FlowError::NotSelected(_) => "nothing_selected",
            FlowError::NotFound(..) => "not_found",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicView {
    pub batch_id: i64,
    pub subject_id: i64,
    pub topic_id: i64,
    pub summary: Option<TopicSummary>,
    pub concepts: Vec<ConceptRow>,
    pub students: Vec<StudentRow>,
    pub bands: Vec<BandCount>,
    pub class_average_marks: Option<f64>,
    pub used_cached_fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

impl TopicView {
    #[cfg(test)]
    pub fn empty(batch_id: i64, subject_id: i64, topic_id: i64) -> Self {
        Self::build(batch_id, subject_id, topic_id, &TopicRecords::default(), false)
    }

    fn build(
        batch_id: i64,
        subject_id: i64,
        topic_id: i64,
        records: &TopicRecords,
        used_cached_fallback: bool,
    ) -> Self {
        let summary = calc::topic_summary(&records.concepts);
        let students = records
            .students
            .iter()
            .map(calc::student_row)
            .collect::<Vec<_>>();
        let bands = calc::band_distribution(students.iter().map(|s| &s.band));
        let message = if summary.is_none() && students.is_empty() {
            Some(calc::NO_DATA_MESSAGE)
        } else {
            None
        };
        Self {
            batch_id,
            subject_id,
            topic_id,
            summary,
            concepts: records.concepts.iter().map(calc::concept_row).collect(),
            students,
            bands,
            class_average_marks: calc::class_average_marks(&records.students),
            used_cached_fallback,
            message,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TopicLine {
    pub topic_id: i64,
    pub topic_name: String,
    pub summary: Option<TopicSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllTopicsView {
    pub batch_id: i64,
    pub subject_id: i64,
    pub topics: Vec<TopicLine>,
    pub rollup: Rollup,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConceptDetail {
    pub concept: ConceptRow,
    pub weak_students: Vec<StudentRow>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BaselineView {
    pub batch_id: i64,
    pub student_id: Option<i64>,
    pub summary: Option<BaselineSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchLine {
    pub batch_id: i64,
    pub batch_name: String,
    pub grade_label: String,
    pub student_count: i64,
    pub average_percent: Option<f64>,
    pub participation_rate: Option<f64>,
    pub bands: Vec<BandCount>,
    pub cached: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrincipalOverview {
    pub batches: Vec<BatchLine>,
    pub rollup: SchoolRollup,
    pub bands: Vec<BandCount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

fn require(ctx: &SessionContext, level: &'static str, v: Option<i64>) -> Result<i64, FlowError> {
    ctx.user()?;
    v.ok_or(FlowError::NotSelected(level))
}

fn org_code(user: &AuthUser) -> String {
    user.org_code.clone()
}

/// Batches and subjects for the logged-in teacher.
pub fn load_dropdowns(
    ctx: &mut SessionContext,
    source: &dyn DataSource,
    refresh: bool,
) -> Result<(DropdownData, bool), FlowError> {
    let user = ctx.user()?.clone();
    let key = cache_key(&[user.user_id]);
    if !refresh {
        if let Some(hit) = ctx.caches.dropdowns.get(&key) {
            return Ok((hit.clone(), true));
        }
    }
    let data = source.teacher_dropdowns(&DropdownParams {
        org_code: org_code(&user),
        user_id: user.user_id,
        ..Default::default()
    })?;
    ctx.caches.dropdowns.insert(key, data.clone());
    Ok((data, false))
}

/// Topics of the selected batch and subject.
pub fn load_topics(
    ctx: &mut SessionContext,
    source: &dyn DataSource,
    refresh: bool,
) -> Result<(Vec<Topic>, bool), FlowError> {
    let batch_id = require(ctx, "batch", ctx.selection.batch_id)?;
    let subject_id = require(ctx, "subject", ctx.selection.subject_id)?;
    let user = ctx.user()?.clone();
    let key = cache_key(&[batch_id, subject_id]);
    if !refresh {
        if let Some(hit) = ctx.caches.topics.get(&key) {
            return Ok((hit.clone(), true));
        }
    }
    let list = source.subject_topics(&TopicParams {
        org_code: org_code(&user),
        user_id: user.user_id,
        batch_id,
        subject_id,
    })?;
    ctx.caches.topics.insert(key, list.topics.clone());
    Ok((list.topics, false))
}

fn fetch_topic_records(
    ctx: &mut SessionContext,
    source: &dyn DataSource,
    user: &AuthUser,
    batch_id: i64,
    subject_id: i64,
    topic_id: i64,
) -> Result<(TopicRecords, bool), FlowError> {
    let dropdown = source.teacher_dropdowns(&DropdownParams {
        org_code: org_code(user),
        user_id: user.user_id,
        batch_id: Some(batch_id),
        subject_id: Some(subject_id),
        topic_id: Some(topic_id),
    })?;
    let performance = source.performance_status(&PerformanceParams {
        org_code: org_code(user),
        user_id: user.user_id,
        batch_id,
        topic_id,
    })?;

    let dropdown_records = TopicRecords {
        concepts: dropdown.concepts,
        students: dropdown.students,
    };
    let merged_key = cache_key(&[batch_id, topic_id]);
    let outcome = merge::reconcile(
        &dropdown_records,
        &performance,
        ctx.caches.merged.get(&merged_key),
    );
    info!(
        batch_id,
        topic_id,
        matched_concepts = outcome.matched_concepts,
        matched_students = outcome.matched_students,
        fallback = outcome.used_cached_fallback,
        "topic records merged"
    );
    ctx.caches
        .merged
        .insert(merged_key, outcome.records.clone());
    Ok((outcome.records, outcome.used_cached_fallback))
}

/// Merged concepts and students of the selected topic, with summaries.
/// Returns the cached view unless `refresh` is set.
pub fn open_topic(
    ctx: &mut SessionContext,
    source: &dyn DataSource,
    refresh: bool,
) -> Result<(TopicView, bool), FlowError> {
    let batch_id = require(ctx, "batch", ctx.selection.batch_id)?;
    let subject_id = require(ctx, "subject", ctx.selection.subject_id)?;
    let topic_id = require(ctx, "topic", ctx.selection.topic_id)?;
    let user = ctx.user()?.clone();

    let view_key = cache_key(&[batch_id, subject_id, topic_id]);
    if !refresh {
        if let Some(hit) = ctx.caches.views.get(&view_key) {
            return Ok((hit.clone(), true));
        }
    }

    let (records, fallback) =
        fetch_topic_records(ctx, source, &user, batch_id, subject_id, topic_id)?;
    let view = TopicView::build(batch_id, subject_id, topic_id, &records, fallback);
    ctx.caches.views.insert(view_key, view.clone());
    Ok((view, false))
}

/// Every topic of the selected subject, fetched one after another. A topic
/// that fails is reported on its own line and the loop carries on.
pub fn open_all_topics(
    ctx: &mut SessionContext,
    source: &dyn DataSource,
) -> Result<AllTopicsView, FlowError> {
    let batch_id = require(ctx, "batch", ctx.selection.batch_id)?;
    let subject_id = require(ctx, "subject", ctx.selection.subject_id)?;
    let user = ctx.user()?.clone();
    let (topics, _) = load_topics(ctx, source, false)?;

    let mut lines = Vec::with_capacity(topics.len());
    for topic in &topics {
        match fetch_topic_records(ctx, source, &user, batch_id, subject_id, topic.topic_id) {
            Ok((records, fallback)) => {
                // Keep the per-topic view in step with what this loop just fetched.
                let view =
                    TopicView::build(batch_id, subject_id, topic.topic_id, &records, fallback);
                lines.push(TopicLine {
                    topic_id: topic.topic_id,
                    topic_name: topic.topic_name.clone(),
                    summary: view.summary.clone(),
                    error: None,
                });
                let key = cache_key(&[batch_id, subject_id, topic.topic_id]);
                ctx.caches.views.insert(key, view);
            }
            Err(e) => {
                warn!(topic_id = topic.topic_id, error = %e, "topic fetch failed");
                lines.push(TopicLine {
                    topic_id: topic.topic_id,
                    topic_name: topic.topic_name.clone(),
                    summary: None,
                    error: Some(e.to_string()),
                });
            }
        }
    }

    let rollup = calc::rollup(lines.iter().map(|l| l.summary.as_ref()));
    let message = if rollup.topics_with_data == 0 {
        Some(calc::NO_DATA_MESSAGE)
    } else {
        None
    };
    Ok(AllTopicsView {
        batch_id,
        subject_id,
        topics: lines,
        rollup,
        message,
    })
}

pub fn concept_detail(
    ctx: &mut SessionContext,
    source: &dyn DataSource,
) -> Result<ConceptDetail, FlowError> {
    let concept_id = require(ctx, "concept", ctx.selection.concept_id)?;
    let (view, _) = open_topic(ctx, source, false)?;
    let concept = view
        .concepts
        .iter()
        .find(|c| c.concept_id == concept_id)
        .cloned()
        .ok_or(FlowError::NotFound("concept", concept_id))?;
    let weak_students = view
        .students
        .iter()
        .filter(|s| {
            s.weak_concept_names
                .iter()
                .any(|n| n.eq_ignore_ascii_case(&concept.concept_text))
        })
        .cloned()
        .collect();
    Ok(ConceptDetail {
        concept,
        weak_students,
    })
}

pub fn student_detail(
    ctx: &mut SessionContext,
    source: &dyn DataSource,
) -> Result<StudentRow, FlowError> {
    let student_id = require(ctx, "student", ctx.selection.student_id)?;
    let (view, _) = open_topic(ctx, source, false)?;
    view.students
        .iter()
        .find(|s| s.student_id == student_id)
        .cloned()
        .ok_or(FlowError::NotFound("student", student_id))
}

fn cached_baseline(
    ctx: &mut SessionContext,
    source: &dyn DataSource,
    user: &AuthUser,
    batch_id: i64,
    student_id: Option<i64>,
    refresh: bool,
) -> Result<(BaselineReport, bool), FlowError> {
    let key = match student_id {
        Some(s) => cache_key(&[batch_id, s]),
        None => format!("{}:all", batch_id),
    };
    if !refresh {
        if let Some(hit) = ctx.caches.baseline.get(&key) {
            return Ok((hit.clone(), true));
        }
    }
    let report = source.baseline_report(&BaselineParams {
        org_code: org_code(user),
        user_id: user.user_id,
        batch_id,
        student_id,
    })?;
    ctx.caches.baseline.insert(key, report.clone());
    Ok((report, false))
}

pub fn baseline(
    ctx: &mut SessionContext,
    source: &dyn DataSource,
    student_id: Option<i64>,
    refresh: bool,
) -> Result<(BaselineView, bool), FlowError> {
    let batch_id = require(ctx, "batch", ctx.selection.batch_id)?;
    let user = ctx.user()?.clone();
    let (report, cached) = cached_baseline(ctx, source, &user, batch_id, student_id, refresh)?;

    let summary = calc::baseline_summary(&report);
    let message = summary.is_none().then_some(calc::NO_DATA_MESSAGE);
    Ok((
        BaselineView {
            batch_id,
            student_id,
            summary,
            message,
        },
        cached,
    ))
}

/// School-wide baseline picture: every batch the user can see, fetched one
/// after another. A failing batch gets an error line and the loop carries on.
pub fn principal_overview(
    ctx: &mut SessionContext,
    source: &dyn DataSource,
    refresh: bool,
) -> Result<PrincipalOverview, FlowError> {
    let user = ctx.user()?.clone();
    let (dropdowns, _) = load_dropdowns(ctx, source, refresh)?;

    let mut lines = Vec::with_capacity(dropdowns.batches.len());
    let mut summaries = Vec::with_capacity(dropdowns.batches.len());
    for batch in &dropdowns.batches {
        let mut line = BatchLine {
            batch_id: batch.batch_id,
            batch_name: batch.batch_name.clone(),
            grade_label: batch.grade_label.clone(),
            student_count: batch.student_count,
            average_percent: None,
            participation_rate: None,
            bands: calc::band_distribution(std::iter::empty()),
            cached: false,
            error: None,
        };
        match cached_baseline(ctx, source, &user, batch.batch_id, None, refresh) {
            Ok((report, cached)) => {
                let summary = calc::baseline_summary(&report);
                line.cached = cached;
                if let Some(s) = &summary {
                    line.student_count = s.total_students;
                    line.average_percent = Some(s.average_percent);
                    line.participation_rate = Some(s.participation_rate);
                    line.bands = s.bands.clone();
                }
                summaries.push(summary);
            }
            Err(e) => {
                warn!(batch_id = batch.batch_id, error = %e, "baseline fetch failed");
                line.error = Some(e.to_string());
                summaries.push(None);
            }
        }
        lines.push(line);
    }

    let rollup = calc::school_rollup(summaries.iter().map(|s| s.as_ref()));
    let bands = calc::band_distribution(
        summaries
            .iter()
            .flatten()
            .flat_map(|s| s.students.iter().map(|r| &r.band)),
    );
    info!(
        batches = rollup.batch_count,
        with_data = rollup.batches_with_data,
        "principal overview built"
    );
    let message = (rollup.batches_with_data == 0).then_some(calc::NO_DATA_MESSAGE);
    Ok(PrincipalOverview {
        batches: lines,
        rollup,
        bands,
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::LoginParams;
    use crate::records::{
        Batch, BaselineStudent, Concept, PerformanceStatus, Student, TopicList,
    };
    use crate::selection::{Level, SelectionState};
    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;

    /// In-memory backend; performance responses are served in order and the
    /// last one repeats.
    #[derive(Default)]
    struct FakeSource {
        topics: Vec<Topic>,
        dropdown: DropdownData,
        performance: RefCell<Vec<PerformanceStatus>>,
        failing_topic: Option<i64>,
        baselines: HashMap<i64, BaselineReport>,
        failing_batch: Option<i64>,
        calls: Cell<usize>,
    }

    impl DataSource for FakeSource {
        fn login(&self, _: &LoginParams) -> Result<AuthUser, BackendError> {
            Ok(AuthUser::default())
        }

        fn teacher_dropdowns(&self, _: &DropdownParams) -> Result<DropdownData, BackendError> {
            self.calls.set(self.calls.get() + 1);
            Ok(self.dropdown.clone())
        }

        fn subject_topics(&self, _: &TopicParams) -> Result<TopicList, BackendError> {
            self.calls.set(self.calls.get() + 1);
            Ok(TopicList {
                topics: self.topics.clone(),
            })
        }

        fn performance_status(
            &self,
            params: &PerformanceParams,
        ) -> Result<PerformanceStatus, BackendError> {
            self.calls.set(self.calls.get() + 1);
            if Some(params.topic_id) == self.failing_topic {
                return Err(BackendError::Status {
                    endpoint: "performance_status",
                    status: 500,
                });
            }
            let mut queue = self.performance.borrow_mut();
            if queue.len() > 1 {
                Ok(queue.remove(0))
            } else {
                Ok(queue.first().cloned().unwrap_or_default())
            }
        }

        fn baseline_report(
            &self,
            params: &BaselineParams,
        ) -> Result<BaselineReport, BackendError> {
            self.calls.set(self.calls.get() + 1);
            if Some(params.batch_id) == self.failing_batch {
                return Err(BackendError::Status {
                    endpoint: "baseline_report",
                    status: 502,
                });
            }
            Ok(self
                .baselines
                .get(&params.batch_id)
                .cloned()
                .unwrap_or_default())
        }
    }

    fn student(id: i64, total: i64, cleared: i64, marks: f64, weak: &[&str]) -> Student {
        Student {
            student_id: id,
            student_name: format!("S{}", id),
            total_concepts: total,
            cleared_concepts: cleared,
            average_marks: marks,
            weak_concept_names: weak.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    fn concept(id: i64, text: &str, attended: i64, cleared: i64) -> Concept {
        Concept {
            concept_id: id,
            concept_text: text.into(),
            attended_count: attended,
            cleared_count: cleared,
            ..Default::default()
        }
    }

    fn source() -> FakeSource {
        FakeSource {
            topics: vec![
                Topic {
                    topic_id: 3,
                    topic_name: "Fractions".into(),
                    subject_id: 2,
                },
                Topic {
                    topic_id: 4,
                    topic_name: "Decimals".into(),
                    subject_id: 2,
                },
            ],
            dropdown: DropdownData {
                concepts: vec![concept(1, "Halves", 0, 0), concept(2, "Thirds", 0, 0)],
                students: vec![student(10, 0, 0, 0.0, &[]), student(11, 0, 0, 0.0, &[])],
                ..Default::default()
            },
            performance: RefCell::new(vec![PerformanceStatus {
                concepts: vec![concept(1, "Halves", 20, 15), concept(2, "Thirds", 10, 5)],
                students: vec![
                    student(10, 10, 6, 52.0, &["Thirds"]),
                    student(11, 10, 9, 80.0, &[]),
                ],
            }]),
            ..Default::default()
        }
    }

    fn ctx_at_topic() -> SessionContext {
        let mut ctx = SessionContext::new();
        ctx.login(AuthUser {
            user_id: 5,
            org_code: "ORG".into(),
            ..Default::default()
        });
        ctx.select(Level::Batch, Some(1)).expect("batch");
        ctx.select(Level::Subject, Some(2)).expect("subject");
        ctx.select(Level::Topic, Some(3)).expect("topic");
        ctx
    }

    #[test]
    fn open_topic_merges_and_caches() {
        let src = source();
        let mut ctx = ctx_at_topic();

        let (view, cached) = open_topic(&mut ctx, &src, false).expect("open topic");
        assert!(!cached);
        assert_eq!(view.concepts[0].attended_count, 20);
        let summary = view.summary.as_ref().expect("summary");
        assert_eq!(summary.mastery_rate, 66.7);
        assert_eq!(view.students[0].band, calc::Band::Achiever);
        assert_eq!(view.students[1].band, calc::Band::Outstanding);
        assert!(view.message.is_none());

        let calls = src.calls.get();
        let (_, cached) = open_topic(&mut ctx, &src, false).expect("reopen topic");
        assert!(cached);
        assert_eq!(src.calls.get(), calls);
    }

    #[test]
    fn refresh_with_zeroed_students_uses_cached_metrics() {
        let src = source();
        src.performance.borrow_mut().push(PerformanceStatus {
            concepts: vec![concept(1, "Halves", 20, 15)],
            students: vec![student(10, 0, 0, 0.0, &[]), student(11, 0, 0, 0.0, &[])],
        });
        let mut ctx = ctx_at_topic();

        open_topic(&mut ctx, &src, false).expect("first open");
        let (view, _) = open_topic(&mut ctx, &src, true).expect("refresh");
        assert!(view.used_cached_fallback);
        assert_eq!(view.students[0].average_marks, 52.0);
        assert_eq!(view.students[1].average_marks, 80.0);
    }

    #[test]
    fn missing_selection_is_reported() {
        let src = source();
        let mut ctx = SessionContext::new();
        ctx.login(AuthUser::default());
        ctx.select(Level::Batch, Some(1)).expect("batch");
        let e = open_topic(&mut ctx, &src, false).unwrap_err();
        assert_eq!(e.code(), "nothing_selected");
        assert_eq!(e.to_string(), "select a subject first");
    }

    #[test]
    fn empty_topic_shows_no_data() {
        let src = FakeSource::default();
        let mut ctx = ctx_at_topic();
        let (view, _) = open_topic(&mut ctx, &src, false).expect("open");
        assert_eq!(view.message, Some(calc::NO_DATA_MESSAGE));
        assert_eq!(view.bands.len(), 4);
    }

    #[test]
    fn all_topics_continue_past_a_failing_topic() {
        let mut src = source();
        src.failing_topic = Some(4);
        let mut ctx = ctx_at_topic();

        let all = open_all_topics(&mut ctx, &src).expect("all topics");
        assert_eq!(all.topics.len(), 2);
        assert!(all.topics[0].summary.is_some());
        assert!(all.topics[1].error.is_some());
        assert_eq!(all.rollup.topic_count, 2);
        assert_eq!(all.rollup.topics_with_data, 1);
    }

    #[test]
    fn all_topics_refreshes_cached_topic_views() {
        let src = source();
        src.performance.borrow_mut().push(PerformanceStatus {
            concepts: vec![concept(1, "Halves", 10, 1)],
            students: vec![student(10, 10, 1, 12.0, &[]), student(11, 10, 2, 20.0, &[])],
        });
        let mut ctx = ctx_at_topic();

        let (first, _) = open_topic(&mut ctx, &src, false).expect("first open");
        assert_eq!(first.summary.as_ref().map(|s| s.mastery_rate), Some(66.7));

        let all = open_all_topics(&mut ctx, &src).expect("all topics");
        let line_rate = all.topics[0].summary.as_ref().map(|s| s.mastery_rate);
        assert_eq!(line_rate, Some(10.0));

        let (reopened, cached) = open_topic(&mut ctx, &src, false).expect("reopen");
        assert!(cached);
        assert_eq!(reopened.summary.as_ref().map(|s| s.mastery_rate), line_rate);
        assert_eq!(reopened.students[0].average_marks, 12.0);
    }

    #[test]
    fn concept_detail_lists_weak_students() {
        let src = source();
        let mut ctx = ctx_at_topic();
        ctx.select(Level::Concept, Some(2)).expect("concept");
        let detail = concept_detail(&mut ctx, &src).expect("detail");
        assert_eq!(detail.concept.concept_text, "Thirds");
        assert_eq!(detail.weak_students.len(), 1);
        assert_eq!(detail.weak_students[0].student_id, 10);
    }

    #[test]
    fn unknown_student_is_not_found() {
        let src = source();
        let mut ctx = ctx_at_topic();
        ctx.select(Level::Student, Some(99)).expect("student");
        let e = student_detail(&mut ctx, &src).unwrap_err();
        assert_eq!(e.code(), "not_found");
    }

    #[test]
    fn baseline_without_data_is_neutral() {
        let src = source();
        let mut ctx = ctx_at_topic();
        let (view, cached) = baseline(&mut ctx, &src, None, false).expect("baseline");
        assert!(!cached);
        assert!(view.summary.is_none());
        assert_eq!(view.message, Some(calc::NO_DATA_MESSAGE));
        let (_, cached) = baseline(&mut ctx, &src, None, false).expect("baseline again");
        assert!(cached);
    }

    fn batch(id: i64, name: &str) -> Batch {
        Batch {
            batch_id: id,
            batch_name: name.into(),
            ..Default::default()
        }
    }

    fn baseline_of(scores: &[f64], attempted: i64) -> BaselineReport {
        BaselineReport {
            total_students: scores.len() as i64,
            attempted_students: attempted,
            students: scores
                .iter()
                .enumerate()
                .map(|(i, score)| BaselineStudent {
                    student_id: i as i64 + 1,
                    score: *score,
                    max_score: 20.0,
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn principal_overview_rolls_up_batches_past_a_failure() {
        let mut src = source();
        src.dropdown.batches = vec![
            batch(1, "6A"),
            batch(2, "6B"),
            batch(3, "7A"),
            batch(4, "7B"),
        ];
        src.baselines.insert(1, baseline_of(&[16.0, 8.0], 2));
        src.baselines.insert(2, baseline_of(&[18.0, 12.0], 1));
        src.failing_batch = Some(3);
        let mut ctx = SessionContext::new();
        ctx.login(AuthUser {
            user_id: 5,
            ..Default::default()
        });

        let overview = principal_overview(&mut ctx, &src, false).expect("overview");
        assert_eq!(overview.batches.len(), 4);
        assert_eq!(overview.batches[0].average_percent, Some(60.0));
        assert_eq!(overview.batches[1].average_percent, Some(75.0));
        assert!(overview.batches[2].error.is_some());
        assert!(overview.batches[3].average_percent.is_none());
        assert!(overview.batches[3].error.is_none());
        assert_eq!(overview.rollup.batch_count, 4);
        assert_eq!(overview.rollup.batches_with_data, 2);
        assert_eq!(overview.rollup.mean_average_percent, 67.5);
        assert_eq!(overview.rollup.mean_participation_rate, 75.0);
        let counts: Vec<usize> = overview.bands.iter().map(|b| b.count).collect();
        assert_eq!(counts, vec![2, 1, 1, 0]);
        assert!(overview.message.is_none());
        assert_eq!(ctx.selection, SelectionState::default());

        let calls = src.calls.get();
        let again = principal_overview(&mut ctx, &src, false).expect("cached overview");
        assert!(again.batches[0].cached);
        // Only the failed batch is asked for again.
        assert_eq!(src.calls.get(), calls + 1);
    }

    #[test]
    fn principal_overview_needs_login_and_reports_no_data() {
        let src = FakeSource::default();
        let mut ctx = SessionContext::new();
        let e = principal_overview(&mut ctx, &src, false).unwrap_err();
        assert_eq!(e.code(), "not_logged_in");

        ctx.login(AuthUser::default());
        let overview = principal_overview(&mut ctx, &src, false).expect("overview");
        assert!(overview.batches.is_empty());
        assert_eq!(overview.message, Some(calc::NO_DATA_MESSAGE));
        assert_eq!(overview.bands.len(), 4);
    }
}
