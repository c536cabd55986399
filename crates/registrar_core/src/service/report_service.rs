//! Grade report aggregation and CSV export.
//!
//! # Responsibility
//! - Resolve every grade into one report row (student, subject, grader) in
//!   parallel, keeping the store's grade order.
//! - Write the report with a fixed header row.
//!
//! # Invariants
//! - Row `i` of the report always describes grade `i` of the listing.
//! - One failed row fails the whole report; no partial report is written.

use crate::config::CoreConfig;
use crate::fanout::{AggregateError, ReportAggregator};
use crate::model::{DepartmentId, Grade};
use crate::repo::{GradeListQuery, RecordStore, RepoError};
use crate::service::{ServiceError, ServiceResult};
use chrono::DateTime;
use log::{info, warn};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

pub const GRADE_REPORT_HEADERS: [&str; 9] = [
    "Student ID",
    "Student Name",
    "Process Score",
    "Midterm Score",
    "Final Score",
    "Subject",
    "Instructor",
    "Created At",
    "Updated At",
];

const ALL_GRADES_SHEET: &str = "Grades";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportScope {
    All,
    Department(DepartmentId),
}

#[derive(Debug, Clone, PartialEq)]
pub struct GradeReportRow {
    pub student_id: String,
    pub student_name: String,
    pub process_score: f64,
    pub midterm_score: f64,
    pub final_score: f64,
    pub subject_name: String,
    pub instructor_name: String,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    /// Unix epoch milliseconds.
    pub updated_at: i64,
}

impl GradeReportRow {
    fn to_record(&self) -> [String; 9] {
        [
            self.student_id.clone(),
            self.student_name.clone(),
            format_score(self.process_score),
            format_score(self.midterm_score),
            format_score(self.final_score),
            self.subject_name.clone(),
            self.instructor_name.clone(),
            format_timestamp(self.created_at),
            format_timestamp(self.updated_at),
        ]
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GradeReport {
    /// Department name, or `Grades` for the whole school.
    pub sheet_name: String,
    pub rows: Vec<GradeReportRow>,
}

impl GradeReport {
    /// Default export file name: the sheet name with every character other
    /// than ASCII letters and digits replaced by `_`.
    pub fn file_name(&self) -> String {
        let stem: String = self
            .sheet_name
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
            .collect();
        format!("{stem}.csv")
    }
}

pub struct ReportService<S: RecordStore> {
    store: Arc<S>,
    aggregator: ReportAggregator,
}

impl<S: RecordStore> ReportService<S> {
    pub fn new(store: Arc<S>, config: &CoreConfig) -> Self {
        Self {
            store,
            aggregator: ReportAggregator::new(config.max_workers),
        }
    }

    /// Builds the grade report for `scope`.
    ///
    /// # Errors
    /// - `NotFound` for an unknown department, or when a grade points at a
    ///   missing student, subject or instructor.
    pub fn build_grade_report(&self, scope: ReportScope) -> ServiceResult<GradeReport> {
        let started_at = Instant::now();
        let (sheet_name, department_id) = match scope {
            ReportScope::All => (ALL_GRADES_SHEET.to_string(), None),
            ReportScope::Department(id) => {
                let department = self
                    .store
                    .get_department(id)?
                    .ok_or_else(|| ServiceError::not_found("department", id))?;
                (department.name, Some(id))
            }
        };

        let grades = self.store.list_grades(&GradeListQuery { department_id })?;
        let rows = self
            .aggregator
            .aggregate(&grades, |grade| self.resolve_row(grade))
            .map_err(|err| match err {
                AggregateError::Row { index, error } => {
                    warn!(
                        "event=grade_report module=report status=error row={} grade={} error={}",
                        index, grades[index].id, error
                    );
                    error
                }
                AggregateError::Incomplete { index } => ServiceError::Infrastructure(
                    RepoError::InvalidData(format!("report row {index} was not resolved")),
                ),
            })?;

        info!(
            "event=grade_report module=report status=ok sheet={} rows={} duration_ms={}",
            sheet_name,
            rows.len(),
            started_at.elapsed().as_millis()
        );
        Ok(GradeReport { sheet_name, rows })
    }

    fn resolve_row(&self, grade: &Grade) -> ServiceResult<GradeReportRow> {
        let student = self
            .store
            .get_student(&grade.student_id)?
            .ok_or_else(|| ServiceError::not_found("student", &grade.student_id))?;
        let subject = self
            .store
            .get_subject(&grade.subject_id)?
            .ok_or_else(|| ServiceError::not_found("subject", &grade.subject_id))?;
        let instructor = self
            .store
            .get_instructor(&grade.by_instructor_id)?
            .ok_or_else(|| ServiceError::not_found("instructor", &grade.by_instructor_id))?;

        Ok(GradeReportRow {
            student_id: student.id.clone(),
            student_name: student.full_name(),
            process_score: grade.scores.process,
            midterm_score: grade.scores.midterm,
            final_score: grade.scores.final_exam,
            subject_name: subject.name,
            instructor_name: instructor.full_name(),
            created_at: grade.created_at,
            updated_at: grade.updated_at,
        })
    }

    /// Builds the report and writes it as CSV to `path`.
    pub fn export_grade_report(
        &self,
        scope: ReportScope,
        path: impl AsRef<Path>,
    ) -> ServiceResult<GradeReport> {
        let report = self.build_grade_report(scope)?;
        write_report_file(&report, path.as_ref())?;
        Ok(report)
    }

    /// Builds the report and writes it into `dir` under
    /// [`GradeReport::file_name`]. Returns the report and the written path.
    pub fn export_grade_report_into(
        &self,
        scope: ReportScope,
        dir: impl AsRef<Path>,
    ) -> ServiceResult<(GradeReport, PathBuf)> {
        let report = self.build_grade_report(scope)?;
        let path = dir.as_ref().join(report.file_name());
        write_report_file(&report, &path)?;
        Ok((report, path))
    }
}

fn write_report_file(report: &GradeReport, path: &Path) -> ServiceResult<()> {
    let file = File::create(path)?;
    write_csv(report, file)?;
    info!(
        "event=grade_export module=report status=ok sheet={} rows={} path={}",
        report.sheet_name,
        report.rows.len(),
        path.display()
    );
    Ok(())
}

/// Writes the header row then one record per report row.
pub fn write_csv<W: Write>(report: &GradeReport, writer: W) -> ServiceResult<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(GRADE_REPORT_HEADERS)?;
    for row in &report.rows {
        csv_writer.write_record(row.to_record())?;
    }
    csv_writer.flush()?;
    Ok(())
}

fn format_score(score: f64) -> String {
    format!("{score:.2}")
}

/// `YYYY-MM-DD HH:MM:SS` in UTC; empty when out of range.
fn format_timestamp(epoch_ms: i64) -> String {
    DateTime::from_timestamp_millis(epoch_ms)
        .map(|at| at.format(TIMESTAMP_FORMAT).to_string())
        .unwrap_or_default()
}
