mod common;

use common::{department, hosted_class, instructor, new_student, registrar_with, subject};
use registrar_core::model::GradeScores;
use registrar_core::service::{NewGrade, ReportScope, GRADE_REPORT_HEADERS};
use registrar_core::{CoreConfig, Registrar, ServiceError, SqliteStore};

/// Seeds two departments; department 1 gets `per_department` grades for
/// each of its two subjects, department 2 gets one grade.
fn seeded(per_department: u32) -> Registrar<SqliteStore> {
    let config = CoreConfig {
        max_workers: 3,
        ..CoreConfig::default()
    };
    let (_store, registrar) = registrar_with(&config);
    department(&registrar, 1, "CSE");
    department(&registrar, 2, "EE");

    let grader = instructor(&registrar, 1, 1);
    let class = hosted_class(&registrar, 1, &grader, 100);
    let subjects = [
        subject(&registrar, 1, "Databases"),
        subject(&registrar, 1, "Networks"),
    ];
    for subject in &subjects {
        registrar
            .enrollment
            .create_assignment(&subject.id, &grader.id)
            .unwrap();
    }
    for n in 0..per_department {
        let student = registrar
            .students
            .create_student(new_student(&class, n))
            .unwrap();
        for subject in &subjects {
            registrar
                .enrollment
                .create_registration(&subject.id, &student.id)
                .unwrap();
            registrar
                .enrollment
                .create_grade(NewGrade {
                    subject_id: subject.id.clone(),
                    student_id: student.id.clone(),
                    instructor_id: grader.id.clone(),
                    scores: GradeScores {
                        process: f64::from(n % 10),
                        midterm: 5.0,
                        final_exam: 6.25,
                    },
                })
                .unwrap();
        }
    }

    let ee_grader = instructor(&registrar, 2, 2);
    let ee_class = hosted_class(&registrar, 2, &ee_grader, 10);
    let ee_student = registrar
        .students
        .create_student(new_student(&ee_class, 900))
        .unwrap();
    let circuits = subject(&registrar, 2, "Circuits");
    registrar
        .enrollment
        .create_assignment(&circuits.id, &ee_grader.id)
        .unwrap();
    registrar
        .enrollment
        .create_registration(&circuits.id, &ee_student.id)
        .unwrap();
    registrar
        .enrollment
        .create_grade(NewGrade {
            subject_id: circuits.id.clone(),
            student_id: ee_student.id.clone(),
            instructor_id: ee_grader.id.clone(),
            scores: GradeScores {
                process: 9.0,
                midterm: 9.0,
                final_exam: 9.0,
            },
        })
        .unwrap();

    registrar
}

#[test]
fn report_has_one_row_per_grade_in_order() {
    let registrar = seeded(12);

    let report = registrar
        .reports
        .build_grade_report(ReportScope::All)
        .unwrap();

    assert_eq!(report.sheet_name, "Grades");
    assert_eq!(report.rows.len(), 12 * 2 + 1);
    for (index, row) in report.rows.iter().take(24).enumerate() {
        let n = u32::try_from(index / 2).unwrap();
        assert_eq!(row.student_name, format!("Student{n} Tran"));
        assert_eq!(row.process_score, f64::from(n % 10));
        assert_eq!(row.instructor_name, "Teacher1 Nguyen");
        let expected_subject = if index % 2 == 0 { "Databases" } else { "Networks" };
        assert_eq!(row.subject_name, expected_subject);
    }
    let last = report.rows.last().unwrap();
    assert_eq!(last.subject_name, "Circuits");
    assert_eq!(last.student_name, "Student900 Tran");
}

#[test]
fn department_scope_filters_by_subject_department() {
    let registrar = seeded(3);

    let report = registrar
        .reports
        .build_grade_report(ReportScope::Department(2))
        .unwrap();
    assert_eq!(report.sheet_name, "Department EE");
    assert_eq!(report.rows.len(), 1);
    assert_eq!(report.rows[0].instructor_name, "Teacher2 Nguyen");

    let missing = registrar
        .reports
        .build_grade_report(ReportScope::Department(42))
        .unwrap_err();
    assert!(matches!(missing, ServiceError::NotFound { entity: "department", .. }));
}

#[test]
fn empty_store_yields_empty_report() {
    let (_store, registrar) = registrar_with(&CoreConfig::default());
    let report = registrar
        .reports
        .build_grade_report(ReportScope::All)
        .unwrap();
    assert!(report.rows.is_empty());
}

#[test]
fn export_writes_header_and_rows() {
    let registrar = seeded(2);
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("grades.csv");

    let report = registrar
        .reports
        .export_grade_report(ReportScope::Department(1), &path)
        .unwrap();

    let mut reader = csv::Reader::from_path(&path).unwrap();
    let headers: Vec<String> = reader
        .headers()
        .unwrap()
        .iter()
        .map(str::to_string)
        .collect();
    assert_eq!(headers, GRADE_REPORT_HEADERS);

    let records: Vec<csv::StringRecord> = reader.records().map(Result::unwrap).collect();
    assert_eq!(records.len(), report.rows.len());
    assert_eq!(records.len(), 4);
    assert_eq!(&records[0][0], report.rows[0].student_id.as_str());
    assert_eq!(&records[0][2], "0.00");
    assert_eq!(&records[0][4], "6.25");
    assert_eq!(records[0][7].len(), "YYYY-MM-DD HH:MM:SS".len());
}

#[test]
fn export_into_directory_names_file_after_sheet() {
    let registrar = seeded(1);
    let dir = tempfile::tempdir().unwrap();

    let (report, path) = registrar
        .reports
        .export_grade_report_into(ReportScope::Department(2), dir.path())
        .unwrap();

    assert_eq!(report.file_name(), "Department_EE.csv");
    assert_eq!(path, dir.path().join("Department_EE.csv"));
    let records = csv::Reader::from_path(&path).unwrap().records().count();
    assert_eq!(records, 1);
}
