//! Shared fixtures for service-level integration tests.
#![allow(dead_code)]

use chrono::{Datelike, Local, NaiveDate};
use parking_lot::Mutex;
use registrar_core::model::{
    Assignment, Class, ClassRoster, Department, DepartmentId, DepartmentUsage, Grade,
    GradeWeights, Instructor, Registration, Student, Subject,
};
use registrar_core::repo::{
    CatalogRepository, ClassRepository, EnrollmentRepository, GradeListQuery,
};
use registrar_core::service::{
    ClassUpdate, NewInstructor, NewStudent, NewSubject, ProvisionClassesRequest,
};
use registrar_core::{CoreConfig, RecordStore, Registrar, RepoError, RepoResult, SqliteStore};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

pub fn registrar() -> (Arc<SqliteStore>, Registrar<SqliteStore>) {
    registrar_with(&CoreConfig::default())
}

pub fn registrar_with(config: &CoreConfig) -> (Arc<SqliteStore>, Registrar<SqliteStore>) {
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    let registrar = Registrar::new(Arc::clone(&store), config);
    (store, registrar)
}

/// Same wiring as [`registrar_with`] over a [`FaultyStore`].
pub fn faulty_registrar(config: &CoreConfig) -> (Arc<FaultyStore>, Registrar<FaultyStore>) {
    let store = Arc::new(FaultyStore::new());
    let registrar = Registrar::new(Arc::clone(&store), config);
    (store, registrar)
}

pub fn this_year() -> i32 {
    Local::now().year()
}

pub fn department<S: RecordStore>(registrar: &Registrar<S>, id: u8, symbol: &str) -> Department {
    registrar
        .catalog
        .create_department(id, symbol, &format!("Department {symbol}"))
        .unwrap()
}

pub fn instructor<S: RecordStore>(registrar: &Registrar<S>, department_id: u8, n: u32) -> Instructor {
    registrar
        .catalog
        .create_instructor(NewInstructor {
            first_name: format!("Teacher{n}"),
            last_name: "Nguyen".to_string(),
            email: format!("teacher{n}@school.edu"),
            phone: format!("0910{n:06}"),
            degree: "MSc".to_string(),
            department_id,
        })
        .unwrap()
}

pub fn subject<S: RecordStore>(registrar: &Registrar<S>, department_id: u8, name: &str) -> Subject {
    registrar
        .catalog
        .create_subject(NewSubject {
            name: name.to_string(),
            credits: 3,
            weights: GradeWeights::new(20, 30, 50),
            department_id,
        })
        .unwrap()
}

/// Provisions one class in the current cohort and gives it a host.
pub fn hosted_class<S: RecordStore>(
    registrar: &Registrar<S>,
    department_id: u8,
    host: &Instructor,
    max_students: u32,
) -> Class {
    let created = registrar
        .classes
        .provision_classes(ProvisionClassesRequest {
            department_id,
            academic_year: this_year(),
            count: 1,
            max_students,
        })
        .unwrap();
    registrar
        .classes
        .update_class(
            &created[0].id,
            ClassUpdate {
                max_students,
                host_instructor_id: Some(host.id.clone()),
            },
        )
        .unwrap()
}

pub fn new_student(class: &Class, n: u32) -> NewStudent {
    NewStudent {
        first_name: format!("Student{n}"),
        last_name: "Tran".to_string(),
        email: format!("student{n}@school.edu"),
        phone: format!("0980{n:06}"),
        birth_day: NaiveDate::from_ymd_opt(2005, 5, 5).unwrap(),
        academic_year: class.academic_year,
        class_id: class.id.clone(),
        department_id: class.department_id,
    }
}

/// How [`FaultyStore::get_instructor`] misbehaves for one instructor id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupFault {
    Missing,
    Broken,
}

/// In-memory store that injects repository failures on demand and
/// otherwise delegates to [`SqliteStore`].
pub struct FaultyStore {
    inner: SqliteStore,
    failing_class_name: Mutex<Option<String>>,
    class_id_conflicts: AtomicU32,
    class_inserts: AtomicU32,
    instructor_fault: Mutex<Option<(String, LookupFault)>>,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self {
            inner: SqliteStore::open_in_memory().unwrap(),
            failing_class_name: Mutex::new(None),
            class_id_conflicts: AtomicU32::new(0),
            class_inserts: AtomicU32::new(0),
            instructor_fault: Mutex::new(None),
        }
    }

    /// Inserting a class with this name fails with invalid data.
    pub fn fail_class_named(&self, name: &str) {
        *self.failing_class_name.lock() = Some(name.to_string());
    }

    pub fn clear_class_faults(&self) {
        *self.failing_class_name.lock() = None;
        self.class_id_conflicts.store(0, Ordering::SeqCst);
    }

    /// The next `times` class inserts collide on `classes.id`.
    pub fn collide_class_ids(&self, times: u32) {
        self.class_id_conflicts.store(times, Ordering::SeqCst);
    }

    /// Class insert attempts seen so far, rejected ones included.
    pub fn class_inserts(&self) -> u32 {
        self.class_inserts.load(Ordering::SeqCst)
    }

    pub fn break_instructor_lookup(&self, id: &str, fault: LookupFault) {
        *self.instructor_fault.lock() = Some((id.to_string(), fault));
    }
}

impl CatalogRepository for FaultyStore {
    fn insert_department(&self, department: &Department) -> RepoResult<()> {
        self.inner.insert_department(department)
    }

    fn get_department(&self, id: DepartmentId) -> RepoResult<Option<Department>> {
        self.inner.get_department(id)
    }

    fn find_department_by_id_or_symbol(
        &self,
        id: DepartmentId,
        symbol: &str,
    ) -> RepoResult<Option<Department>> {
        self.inner.find_department_by_id_or_symbol(id, symbol)
    }

    fn rename_department(&self, id: DepartmentId, name: &str) -> RepoResult<()> {
        self.inner.rename_department(id, name)
    }

    fn delete_department(&self, id: DepartmentId) -> RepoResult<()> {
        self.inner.delete_department(id)
    }

    fn department_usage(&self, id: DepartmentId) -> RepoResult<DepartmentUsage> {
        self.inner.department_usage(id)
    }

    fn insert_subject(&self, subject: &Subject) -> RepoResult<()> {
        self.inner.insert_subject(subject)
    }

    fn get_subject(&self, id: &str) -> RepoResult<Option<Subject>> {
        self.inner.get_subject(id)
    }

    fn update_subject(&self, subject: &Subject) -> RepoResult<()> {
        self.inner.update_subject(subject)
    }

    fn delete_subject(&self, id: &str) -> RepoResult<()> {
        self.inner.delete_subject(id)
    }

    fn list_department_subjects(&self, department_id: DepartmentId) -> RepoResult<Vec<Subject>> {
        self.inner.list_department_subjects(department_id)
    }

    fn insert_instructor(&self, instructor: &Instructor) -> RepoResult<()> {
        self.inner.insert_instructor(instructor)
    }

    fn get_instructor(&self, id: &str) -> RepoResult<Option<Instructor>> {
        match self.instructor_fault.lock().as_ref() {
            Some((broken_id, LookupFault::Missing)) if broken_id == id => Ok(None),
            Some((broken_id, LookupFault::Broken)) if broken_id == id => Err(
                RepoError::InvalidData(format!("unreadable instructor row {id}")),
            ),
            _ => self.inner.get_instructor(id),
        }
    }

    fn update_instructor(&self, instructor: &Instructor) -> RepoResult<()> {
        self.inner.update_instructor(instructor)
    }

    fn delete_instructor(&self, id: &str) -> RepoResult<()> {
        self.inner.delete_instructor(id)
    }

    fn list_department_instructors(
        &self,
        department_id: DepartmentId,
    ) -> RepoResult<Vec<Instructor>> {
        self.inner.list_department_instructors(department_id)
    }

    fn find_instructor_by_contact(
        &self,
        email: &str,
        phone: &str,
        exclude_id: Option<&str>,
    ) -> RepoResult<Option<Instructor>> {
        self.inner.find_instructor_by_contact(email, phone, exclude_id)
    }
}

impl ClassRepository for FaultyStore {
    fn insert_class(&self, class: &Class) -> RepoResult<()> {
        self.class_inserts.fetch_add(1, Ordering::SeqCst);
        let collide = self
            .class_id_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();
        if collide {
            return Err(RepoError::Conflict {
                constraint: "classes.id".to_string(),
            });
        }
        if self.failing_class_name.lock().as_deref() == Some(class.name.as_str()) {
            return Err(RepoError::InvalidData(format!(
                "injected failure for {}",
                class.name
            )));
        }
        self.inner.insert_class(class)
    }

    fn get_class(&self, id: &str) -> RepoResult<Option<Class>> {
        self.inner.get_class(id)
    }

    fn get_class_roster(&self, id: &str) -> RepoResult<Option<ClassRoster>> {
        self.inner.get_class_roster(id)
    }

    fn update_class(&self, class: &Class) -> RepoResult<()> {
        self.inner.update_class(class)
    }

    fn delete_class(&self, id: &str) -> RepoResult<()> {
        self.inner.delete_class(id)
    }

    fn list_hosted_classes(&self, instructor_id: &str) -> RepoResult<Vec<Class>> {
        self.inner.list_hosted_classes(instructor_id)
    }

    fn list_cohort_classes(
        &self,
        department_id: DepartmentId,
        academic_year: i32,
    ) -> RepoResult<Vec<Class>> {
        self.inner.list_cohort_classes(department_id, academic_year)
    }

    fn insert_student(&self, student: &Student) -> RepoResult<()> {
        self.inner.insert_student(student)
    }

    fn get_student(&self, id: &str) -> RepoResult<Option<Student>> {
        self.inner.get_student(id)
    }

    fn update_student(&self, student: &Student) -> RepoResult<()> {
        self.inner.update_student(student)
    }

    fn delete_student(&self, id: &str) -> RepoResult<()> {
        self.inner.delete_student(id)
    }

    fn list_department_students(&self, department_id: DepartmentId) -> RepoResult<Vec<Student>> {
        self.inner.list_department_students(department_id)
    }

    fn find_student_by_contact(
        &self,
        email: &str,
        phone: &str,
        exclude_id: Option<&str>,
    ) -> RepoResult<Option<Student>> {
        self.inner.find_student_by_contact(email, phone, exclude_id)
    }
}

impl EnrollmentRepository for FaultyStore {
    fn insert_assignment(&self, subject_id: &str, instructor_id: &str) -> RepoResult<Assignment> {
        self.inner.insert_assignment(subject_id, instructor_id)
    }

    fn get_assignment(&self, id: i64) -> RepoResult<Option<Assignment>> {
        self.inner.get_assignment(id)
    }

    fn find_assignment(
        &self,
        subject_id: &str,
        instructor_id: &str,
    ) -> RepoResult<Option<Assignment>> {
        self.inner.find_assignment(subject_id, instructor_id)
    }

    fn update_assignment(&self, assignment: &Assignment) -> RepoResult<()> {
        self.inner.update_assignment(assignment)
    }

    fn delete_assignment(&self, id: i64) -> RepoResult<()> {
        self.inner.delete_assignment(id)
    }

    fn insert_registration(&self, subject_id: &str, student_id: &str) -> RepoResult<Registration> {
        self.inner.insert_registration(subject_id, student_id)
    }

    fn get_registration(&self, id: i64) -> RepoResult<Option<Registration>> {
        self.inner.get_registration(id)
    }

    fn find_registration(
        &self,
        subject_id: &str,
        student_id: &str,
    ) -> RepoResult<Option<Registration>> {
        self.inner.find_registration(subject_id, student_id)
    }

    fn update_registration(&self, registration: &Registration) -> RepoResult<()> {
        self.inner.update_registration(registration)
    }

    fn delete_registration(&self, id: i64) -> RepoResult<()> {
        self.inner.delete_registration(id)
    }

    fn insert_grade(&self, grade: &Grade) -> RepoResult<Grade> {
        self.inner.insert_grade(grade)
    }

    fn get_grade(&self, id: i64) -> RepoResult<Option<Grade>> {
        self.inner.get_grade(id)
    }

    fn find_grade(&self, subject_id: &str, student_id: &str) -> RepoResult<Option<Grade>> {
        self.inner.find_grade(subject_id, student_id)
    }

    fn count_grades_by_grader(&self, subject_id: &str, instructor_id: &str) -> RepoResult<usize> {
        self.inner.count_grades_by_grader(subject_id, instructor_id)
    }

    fn update_grade(&self, grade: &Grade) -> RepoResult<()> {
        self.inner.update_grade(grade)
    }

    fn delete_grade(&self, id: i64) -> RepoResult<()> {
        self.inner.delete_grade(id)
    }

    fn list_grades(&self, query: &GradeListQuery) -> RepoResult<Vec<Grade>> {
        self.inner.list_grades(query)
    }
}
