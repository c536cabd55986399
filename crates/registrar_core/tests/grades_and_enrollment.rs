mod common;

use common::{department, hosted_class, instructor, new_student, registrar, subject};
use registrar_core::invariants::PairKind;
use registrar_core::model::{GradeScores, Instructor, Student, Subject};
use registrar_core::repo::EnrollmentRepository;
use registrar_core::service::NewGrade;
use registrar_core::{InvariantViolation, Registrar, ServiceError, SqliteStore};

struct Setup {
    registrar: Registrar<SqliteStore>,
    store: std::sync::Arc<SqliteStore>,
    subject: Subject,
    student: Student,
    grader: Instructor,
}

fn setup() -> Setup {
    let (store, registrar) = registrar();
    department(&registrar, 1, "CSE");
    let grader = instructor(&registrar, 1, 1);
    let class = hosted_class(&registrar, 1, &grader, 30);
    let student = registrar
        .students
        .create_student(new_student(&class, 1))
        .unwrap();
    let subject = subject(&registrar, 1, "Databases");
    Setup {
        registrar,
        store,
        subject,
        student,
        grader,
    }
}

fn scores() -> GradeScores {
    GradeScores {
        process: 8.0,
        midterm: 7.5,
        final_exam: 9.0,
    }
}

fn grade_request(setup: &Setup) -> NewGrade {
    NewGrade {
        subject_id: setup.subject.id.clone(),
        student_id: setup.student.id.clone(),
        instructor_id: setup.grader.id.clone(),
        scores: scores(),
    }
}

#[test]
fn grade_requires_registration_then_assignment() {
    let setup = setup();
    let enrollment = &setup.registrar.enrollment;

    let err = enrollment.create_grade(grade_request(&setup)).unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Validation(InvariantViolation::MissingRegistration { .. })
    ));

    enrollment
        .create_registration(&setup.subject.id, &setup.student.id)
        .unwrap();
    let err = enrollment.create_grade(grade_request(&setup)).unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Validation(InvariantViolation::MissingAssignment { .. })
    ));

    enrollment
        .create_assignment(&setup.subject.id, &setup.grader.id)
        .unwrap();
    let grade = enrollment.create_grade(grade_request(&setup)).unwrap();
    assert!(grade.id > 0);
    assert_eq!(grade.scores, scores());
    assert_eq!(grade.created_at, grade.updated_at);
    assert_eq!(
        setup
            .store
            .find_grade(&setup.subject.id, &setup.student.id)
            .unwrap(),
        Some(grade)
    );
}

#[test]
fn second_grade_for_pair_is_conflict() {
    let setup = setup();
    let enrollment = &setup.registrar.enrollment;
    enrollment
        .create_registration(&setup.subject.id, &setup.student.id)
        .unwrap();
    enrollment
        .create_assignment(&setup.subject.id, &setup.grader.id)
        .unwrap();
    enrollment.create_grade(grade_request(&setup)).unwrap();

    let err = enrollment.create_grade(grade_request(&setup)).unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Conflict(InvariantViolation::DuplicatePair {
            kind: PairKind::Grade,
            ..
        })
    ));
}

#[test]
fn pairs_are_unique_and_department_scoped() {
    let setup = setup();
    let enrollment = &setup.registrar.enrollment;

    enrollment
        .create_assignment(&setup.subject.id, &setup.grader.id)
        .unwrap();
    assert!(enrollment
        .create_assignment(&setup.subject.id, &setup.grader.id)
        .unwrap_err()
        .is_conflict());

    enrollment
        .create_registration(&setup.subject.id, &setup.student.id)
        .unwrap();
    assert!(enrollment
        .create_registration(&setup.subject.id, &setup.student.id)
        .unwrap_err()
        .is_conflict());

    department(&setup.registrar, 2, "EE");
    let foreign_subject = subject(&setup.registrar, 2, "Circuits");
    let err = enrollment
        .create_assignment(&foreign_subject.id, &setup.grader.id)
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Validation(InvariantViolation::DepartmentMismatch { .. })
    ));
    let err = enrollment
        .create_registration(&foreign_subject.id, &setup.student.id)
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Validation(InvariantViolation::DepartmentMismatch { .. })
    ));
}

#[test]
fn update_pairs_checks_targets() {
    let setup = setup();
    let enrollment = &setup.registrar.enrollment;
    let second_subject = subject(&setup.registrar, 1, "Operating Systems");

    let assignment = enrollment
        .create_assignment(&setup.subject.id, &setup.grader.id)
        .unwrap();
    let other = enrollment
        .create_assignment(&second_subject.id, &setup.grader.id)
        .unwrap();

    // Re-saving the same pair is not a duplicate of itself.
    let same = enrollment
        .update_assignment(assignment.id, &setup.subject.id, &setup.grader.id)
        .unwrap();
    assert_eq!(same, assignment);

    let err = enrollment
        .update_assignment(assignment.id, &other.subject_id, &setup.grader.id)
        .unwrap_err();
    assert!(err.is_conflict());

    let registration = enrollment
        .create_registration(&setup.subject.id, &setup.student.id)
        .unwrap();
    let moved = enrollment
        .update_registration(registration.id, &second_subject.id, &setup.student.id)
        .unwrap();
    assert_eq!(moved.subject_id, second_subject.id);
    assert_eq!(
        setup.store.get_registration(registration.id).unwrap(),
        Some(moved)
    );

    let err = enrollment
        .update_registration(9_999, &setup.subject.id, &setup.student.id)
        .unwrap_err();
    assert!(matches!(err, ServiceError::NotFound { entity: "registration", .. }));
}

#[test]
fn grade_scores_update_and_delete() {
    let setup = setup();
    let enrollment = &setup.registrar.enrollment;
    enrollment
        .create_registration(&setup.subject.id, &setup.student.id)
        .unwrap();
    enrollment
        .create_assignment(&setup.subject.id, &setup.grader.id)
        .unwrap();
    let grade = enrollment.create_grade(grade_request(&setup)).unwrap();

    let out_of_scale = GradeScores {
        final_exam: 11.0,
        ..scores()
    };
    assert!(matches!(
        enrollment.update_grade_scores(grade.id, out_of_scale).unwrap_err(),
        ServiceError::Validation(InvariantViolation::ScoreOutOfRange { .. })
    ));

    let revised = GradeScores {
        process: 10.0,
        ..scores()
    };
    let updated = enrollment.update_grade_scores(grade.id, revised).unwrap();
    assert_eq!(updated.scores, revised);
    assert!(updated.updated_at >= grade.updated_at);
    assert_eq!(enrollment.grade(grade.id).unwrap().scores, revised);

    enrollment.delete_grade(grade.id).unwrap();
    assert!(matches!(
        enrollment.delete_grade(grade.id).unwrap_err(),
        ServiceError::NotFound { entity: "grade", .. }
    ));
}

#[test]
fn unknown_participants_are_not_found() {
    let setup = setup();
    let enrollment = &setup.registrar.enrollment;

    let mut request = grade_request(&setup);
    request.instructor_id = "GV01000000".to_string();
    assert!(matches!(
        enrollment.create_grade(request).unwrap_err(),
        ServiceError::NotFound { entity: "instructor", .. }
    ));
    assert!(matches!(
        enrollment
            .create_registration("MH01000000", &setup.student.id)
            .unwrap_err(),
        ServiceError::NotFound { entity: "subject", .. }
    ));
}

#[test]
fn graded_pairs_cannot_be_repointed_or_removed() {
    let setup = setup();
    let enrollment = &setup.registrar.enrollment;
    let second_subject = subject(&setup.registrar, 1, "Operating Systems");
    let registration = enrollment
        .create_registration(&setup.subject.id, &setup.student.id)
        .unwrap();
    let assignment = enrollment
        .create_assignment(&setup.subject.id, &setup.grader.id)
        .unwrap();
    let grade = enrollment.create_grade(grade_request(&setup)).unwrap();

    let err = enrollment
        .update_registration(registration.id, &second_subject.id, &setup.student.id)
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Validation(InvariantViolation::PairHasGrades {
            kind: PairKind::Registration,
            grades: 1,
            ..
        })
    ));
    let err = enrollment
        .update_assignment(assignment.id, &second_subject.id, &setup.grader.id)
        .unwrap_err();
    assert!(matches!(
        err,
        ServiceError::Validation(InvariantViolation::PairHasGrades {
            kind: PairKind::Assignment,
            ..
        })
    ));
    for err in [
        enrollment.delete_registration(registration.id).unwrap_err(),
        enrollment.delete_assignment(assignment.id).unwrap_err(),
    ] {
        assert!(matches!(
            err,
            ServiceError::Validation(InvariantViolation::PairHasGrades { .. })
        ));
    }

    // Re-saving the unchanged pair is still allowed.
    enrollment
        .update_registration(registration.id, &setup.subject.id, &setup.student.id)
        .unwrap();
    assert_eq!(
        setup.store.get_registration(registration.id).unwrap(),
        Some(registration.clone())
    );

    enrollment.delete_grade(grade.id).unwrap();
    enrollment.delete_registration(registration.id).unwrap();
    enrollment.delete_assignment(assignment.id).unwrap();
    assert!(setup.store.get_registration(registration.id).unwrap().is_none());
    assert!(setup.store.get_assignment(assignment.id).unwrap().is_none());
    assert!(matches!(
        enrollment.delete_assignment(assignment.id).unwrap_err(),
        ServiceError::NotFound { entity: "assignment", .. }
    ));
}

#[test]
fn department_grades_follow_subject_department() {
    let setup = setup();
    let enrollment = &setup.registrar.enrollment;
    enrollment
        .create_registration(&setup.subject.id, &setup.student.id)
        .unwrap();
    enrollment
        .create_assignment(&setup.subject.id, &setup.grader.id)
        .unwrap();
    let grade = enrollment.create_grade(grade_request(&setup)).unwrap();
    department(&setup.registrar, 2, "EE");

    assert_eq!(enrollment.department_grades(1).unwrap(), vec![grade]);
    assert!(enrollment.department_grades(2).unwrap().is_empty());
    assert!(matches!(
        enrollment.department_grades(9).unwrap_err(),
        ServiceError::NotFound { entity: "department", .. }
    ));
}
