//! SQLite implementation of every repository contract.
//!
//! # Responsibility
//! - Map records to the migrated schema and back.
//! - Translate constraint failures into `RepoError::Conflict`.
//!
//! # Invariants
//! - One connection, guarded by a mutex; each call holds the lock only for
//!   its own statements, so concurrent callers interleave per call.
//! - Read paths reject rows that do not map to valid records instead of
//!   masking them.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::{open_db, open_db_in_memory};
use crate::model::{
    Assignment, Class, ClassRoster, Department, DepartmentId, DepartmentUsage, Grade,
    GradeScores, GradeWeights, Instructor, Registration, Student, Subject,
};
use crate::repo::{
    CatalogRepository, ClassRepository, EnrollmentRepository, GradeListQuery, RepoError,
    RepoResult,
};
use chrono::NaiveDate;
use parking_lot::Mutex;
use rusqlite::{ffi, params, Connection, OptionalExtension, Row};
use std::path::Path;

const BIRTH_DAY_FORMAT: &str = "%Y-%m-%d";

const DEPARTMENT_SELECT_SQL: &str = "SELECT id, symbol, name FROM departments";

const SUBJECT_SELECT_SQL: &str = "SELECT
    id,
    name,
    credits,
    process_percentage,
    midterm_percentage,
    final_percentage,
    department_id
FROM subjects";

const INSTRUCTOR_SELECT_SQL: &str = "SELECT
    id,
    first_name,
    last_name,
    email,
    phone,
    degree,
    department_id
FROM instructors";

const CLASS_SELECT_SQL: &str = "SELECT
    id,
    name,
    max_students,
    academic_year,
    department_id,
    host_instructor_id,
    created_at,
    updated_at
FROM classes";

const STUDENT_SELECT_SQL: &str = "SELECT
    id,
    first_name,
    last_name,
    email,
    phone,
    birth_day,
    academic_year,
    class_id,
    department_id
FROM students";

const GRADE_SELECT_SQL: &str = "SELECT
    g.id,
    g.process_score,
    g.midterm_score,
    g.final_score,
    g.subject_id,
    g.student_id,
    g.by_instructor_id,
    g.created_at,
    g.updated_at
FROM grades g";

/// Thread-safe record store over one SQLite connection.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Wraps a migrated connection.
    ///
    /// # Errors
    /// - `RepoError::UninitializedConnection` when the schema is not at the
    ///   latest migration version.
    pub fn try_new(conn: Connection) -> RepoResult<Self> {
        ensure_store_connection_ready(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Opens (creating if needed) and migrates a database file.
    pub fn open(path: impl AsRef<Path>) -> RepoResult<Self> {
        Self::try_new(open_db(path)?)
    }

    /// Opens a fresh migrated in-memory database.
    pub fn open_in_memory() -> RepoResult<Self> {
        Self::try_new(open_db_in_memory()?)
    }

    /// Releases the underlying connection.
    pub fn into_inner(self) -> Connection {
        self.conn.into_inner()
    }
}

impl CatalogRepository for SqliteStore {
    fn insert_department(&self, department: &Department) -> RepoResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO departments (id, symbol, name) VALUES (?1, ?2, ?3);",
            params![
                i64::from(department.id),
                department.symbol.as_str(),
                department.name.as_str()
            ],
        )
        .map_err(map_write_error)?;
        Ok(())
    }

    fn get_department(&self, id: DepartmentId) -> RepoResult<Option<Department>> {
        let conn = self.conn.lock();
        conn.query_row(
            &format!("{DEPARTMENT_SELECT_SQL} WHERE id = ?1;"),
            [i64::from(id)],
            read_department_row,
        )
        .optional()?
        .map(finish_department)
        .transpose()
    }

    fn find_department_by_id_or_symbol(
        &self,
        id: DepartmentId,
        symbol: &str,
    ) -> RepoResult<Option<Department>> {
        let conn = self.conn.lock();
        conn.query_row(
            &format!("{DEPARTMENT_SELECT_SQL} WHERE id = ?1 OR symbol = ?2 LIMIT 1;"),
            params![i64::from(id), symbol],
            read_department_row,
        )
        .optional()?
        .map(finish_department)
        .transpose()
    }

    fn rename_department(&self, id: DepartmentId, name: &str) -> RepoResult<()> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE departments SET name = ?2 WHERE id = ?1;",
            params![i64::from(id), name],
        )?;
        ensure_changed(changed, "department", id.to_string())
    }

    fn delete_department(&self, id: DepartmentId) -> RepoResult<()> {
        let conn = self.conn.lock();
        let changed = conn.execute("DELETE FROM departments WHERE id = ?1;", [i64::from(id)])?;
        ensure_changed(changed, "department", id.to_string())
    }

    fn department_usage(&self, id: DepartmentId) -> RepoResult<DepartmentUsage> {
        let conn = self.conn.lock();
        let (subjects, instructors, classes, students): (i64, i64, i64, i64) = conn.query_row(
            "SELECT
                (SELECT COUNT(*) FROM subjects WHERE department_id = ?1),
                (SELECT COUNT(*) FROM instructors WHERE department_id = ?1),
                (SELECT COUNT(*) FROM classes WHERE department_id = ?1),
                (SELECT COUNT(*) FROM students WHERE department_id = ?1);",
            [i64::from(id)],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
        )?;
        Ok(DepartmentUsage {
            subjects: narrow(subjects, "subjects")?,
            instructors: narrow(instructors, "instructors")?,
            classes: narrow(classes, "classes")?,
            students: narrow(students, "students")?,
        })
    }

    fn insert_subject(&self, subject: &Subject) -> RepoResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO subjects (
                id,
                name,
                credits,
                process_percentage,
                midterm_percentage,
                final_percentage,
                department_id
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                subject.id.as_str(),
                subject.name.as_str(),
                subject.credits,
                subject.weights.process,
                subject.weights.midterm,
                subject.weights.final_exam,
                i64::from(subject.department_id),
            ],
        )
        .map_err(map_write_error)?;
        Ok(())
    }

    fn get_subject(&self, id: &str) -> RepoResult<Option<Subject>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!("{SUBJECT_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_subject_row(row)?)),
            None => Ok(None),
        }
    }

    fn update_subject(&self, subject: &Subject) -> RepoResult<()> {
        let conn = self.conn.lock();
        let changed = conn
            .execute(
                "UPDATE subjects
                 SET
                    name = ?2,
                    credits = ?3,
                    process_percentage = ?4,
                    midterm_percentage = ?5,
                    final_percentage = ?6
                 WHERE id = ?1;",
                params![
                    subject.id.as_str(),
                    subject.name.as_str(),
                    subject.credits,
                    subject.weights.process,
                    subject.weights.midterm,
                    subject.weights.final_exam,
                ],
            )
            .map_err(map_write_error)?;
        ensure_changed(changed, "subject", subject.id.clone())
    }

    fn delete_subject(&self, id: &str) -> RepoResult<()> {
        let conn = self.conn.lock();
        let changed = conn.execute("DELETE FROM subjects WHERE id = ?1;", [id])?;
        ensure_changed(changed, "subject", id.to_string())
    }

    fn list_department_subjects(&self, department_id: DepartmentId) -> RepoResult<Vec<Subject>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "{SUBJECT_SELECT_SQL} WHERE department_id = ?1 ORDER BY id ASC;"
        ))?;
        let mut rows = stmt.query([i64::from(department_id)])?;
        let mut subjects = Vec::new();
        while let Some(row) = rows.next()? {
            subjects.push(parse_subject_row(row)?);
        }
        Ok(subjects)
    }

    fn insert_instructor(&self, instructor: &Instructor) -> RepoResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO instructors (
                id,
                first_name,
                last_name,
                email,
                phone,
                degree,
                department_id
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            params![
                instructor.id.as_str(),
                instructor.first_name.as_str(),
                instructor.last_name.as_str(),
                instructor.email.as_str(),
                instructor.phone.as_str(),
                instructor.degree.as_str(),
                i64::from(instructor.department_id),
            ],
        )
        .map_err(map_write_error)?;
        Ok(())
    }

    fn get_instructor(&self, id: &str) -> RepoResult<Option<Instructor>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!("{INSTRUCTOR_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_instructor_row(row)?)),
            None => Ok(None),
        }
    }

    fn update_instructor(&self, instructor: &Instructor) -> RepoResult<()> {
        let conn = self.conn.lock();
        let changed = conn
            .execute(
                "UPDATE instructors
                 SET
                    first_name = ?2,
                    last_name = ?3,
                    email = ?4,
                    phone = ?5,
                    degree = ?6
                 WHERE id = ?1;",
                params![
                    instructor.id.as_str(),
                    instructor.first_name.as_str(),
                    instructor.last_name.as_str(),
                    instructor.email.as_str(),
                    instructor.phone.as_str(),
                    instructor.degree.as_str(),
                ],
            )
            .map_err(map_write_error)?;
        ensure_changed(changed, "instructor", instructor.id.clone())
    }

    fn delete_instructor(&self, id: &str) -> RepoResult<()> {
        let conn = self.conn.lock();
        let changed = conn.execute("DELETE FROM instructors WHERE id = ?1;", [id])?;
        ensure_changed(changed, "instructor", id.to_string())
    }

    fn list_department_instructors(
        &self,
        department_id: DepartmentId,
    ) -> RepoResult<Vec<Instructor>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "{INSTRUCTOR_SELECT_SQL} WHERE department_id = ?1 ORDER BY id ASC;"
        ))?;
        let mut rows = stmt.query([i64::from(department_id)])?;
        let mut instructors = Vec::new();
        while let Some(row) = rows.next()? {
            instructors.push(parse_instructor_row(row)?);
        }
        Ok(instructors)
    }

    fn find_instructor_by_contact(
        &self,
        email: &str,
        phone: &str,
        exclude_id: Option<&str>,
    ) -> RepoResult<Option<Instructor>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "{INSTRUCTOR_SELECT_SQL}
             WHERE (email = ?1 OR phone = ?2)
               AND (?3 IS NULL OR id <> ?3)
             LIMIT 1;"
        ))?;
        let mut rows = stmt.query(params![email, phone, exclude_id])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_instructor_row(row)?)),
            None => Ok(None),
        }
    }
}

impl ClassRepository for SqliteStore {
    fn insert_class(&self, class: &Class) -> RepoResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO classes (
                id,
                name,
                max_students,
                academic_year,
                department_id,
                host_instructor_id,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                class.id.as_str(),
                class.name.as_str(),
                class.max_students,
                class.academic_year,
                i64::from(class.department_id),
                class.host_instructor_id.as_deref(),
                class.created_at,
                class.updated_at,
            ],
        )
        .map_err(map_write_error)?;
        Ok(())
    }

    fn get_class(&self, id: &str) -> RepoResult<Option<Class>> {
        let conn = self.conn.lock();
        get_class_in(&conn, id)
    }

    fn get_class_roster(&self, id: &str) -> RepoResult<Option<ClassRoster>> {
        let conn = self.conn.lock();
        let Some(class) = get_class_in(&conn, id)? else {
            return Ok(None);
        };

        let mut stmt = conn.prepare("SELECT id FROM students WHERE class_id = ?1 ORDER BY id;")?;
        let mut rows = stmt.query([id])?;
        let mut student_ids = Vec::new();
        while let Some(row) = rows.next()? {
            student_ids.push(row.get(0)?);
        }

        Ok(Some(ClassRoster { class, student_ids }))
    }

    fn update_class(&self, class: &Class) -> RepoResult<()> {
        let conn = self.conn.lock();
        let changed = conn
            .execute(
                "UPDATE classes
                 SET
                    max_students = ?2,
                    host_instructor_id = ?3,
                    updated_at = ?4
                 WHERE id = ?1;",
                params![
                    class.id.as_str(),
                    class.max_students,
                    class.host_instructor_id.as_deref(),
                    class.updated_at,
                ],
            )
            .map_err(map_write_error)?;
        ensure_changed(changed, "class", class.id.clone())
    }

    fn delete_class(&self, id: &str) -> RepoResult<()> {
        let conn = self.conn.lock();
        let changed = conn.execute("DELETE FROM classes WHERE id = ?1;", [id])?;
        ensure_changed(changed, "class", id.to_string())
    }

    fn list_hosted_classes(&self, instructor_id: &str) -> RepoResult<Vec<Class>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "{CLASS_SELECT_SQL} WHERE host_instructor_id = ?1 ORDER BY name ASC;"
        ))?;
        let mut rows = stmt.query([instructor_id])?;
        let mut classes = Vec::new();
        while let Some(row) = rows.next()? {
            classes.push(parse_class_row(row)?);
        }
        Ok(classes)
    }

    fn list_cohort_classes(
        &self,
        department_id: DepartmentId,
        academic_year: i32,
    ) -> RepoResult<Vec<Class>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "{CLASS_SELECT_SQL}
             WHERE department_id = ?1
               AND academic_year = ?2
             ORDER BY name ASC;"
        ))?;
        let mut rows = stmt.query(params![i64::from(department_id), academic_year])?;
        let mut classes = Vec::new();
        while let Some(row) = rows.next()? {
            classes.push(parse_class_row(row)?);
        }
        Ok(classes)
    }

    fn insert_student(&self, student: &Student) -> RepoResult<()> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO students (
                id,
                first_name,
                last_name,
                email,
                phone,
                birth_day,
                academic_year,
                class_id,
                department_id
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                student.id.as_str(),
                student.first_name.as_str(),
                student.last_name.as_str(),
                student.email.as_str(),
                student.phone.as_str(),
                student.birth_day.format(BIRTH_DAY_FORMAT).to_string(),
                student.academic_year,
                student.class_id.as_str(),
                i64::from(student.department_id),
            ],
        )
        .map_err(map_write_error)?;
        Ok(())
    }

    fn get_student(&self, id: &str) -> RepoResult<Option<Student>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!("{STUDENT_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_student_row(row)?)),
            None => Ok(None),
        }
    }

    fn update_student(&self, student: &Student) -> RepoResult<()> {
        let conn = self.conn.lock();
        let changed = conn
            .execute(
                "UPDATE students
                 SET
                    first_name = ?2,
                    last_name = ?3,
                    email = ?4,
                    phone = ?5,
                    birth_day = ?6,
                    class_id = ?7
                 WHERE id = ?1;",
                params![
                    student.id.as_str(),
                    student.first_name.as_str(),
                    student.last_name.as_str(),
                    student.email.as_str(),
                    student.phone.as_str(),
                    student.birth_day.format(BIRTH_DAY_FORMAT).to_string(),
                    student.class_id.as_str(),
                ],
            )
            .map_err(map_write_error)?;
        ensure_changed(changed, "student", student.id.clone())
    }

    fn delete_student(&self, id: &str) -> RepoResult<()> {
        let conn = self.conn.lock();
        let changed = conn.execute("DELETE FROM students WHERE id = ?1;", [id])?;
        ensure_changed(changed, "student", id.to_string())
    }

    fn list_department_students(&self, department_id: DepartmentId) -> RepoResult<Vec<Student>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "{STUDENT_SELECT_SQL} WHERE department_id = ?1 ORDER BY id ASC;"
        ))?;
        let mut rows = stmt.query([i64::from(department_id)])?;
        let mut students = Vec::new();
        while let Some(row) = rows.next()? {
            students.push(parse_student_row(row)?);
        }
        Ok(students)
    }

    fn find_student_by_contact(
        &self,
        email: &str,
        phone: &str,
        exclude_id: Option<&str>,
    ) -> RepoResult<Option<Student>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare(&format!(
            "{STUDENT_SELECT_SQL}
             WHERE (email = ?1 OR phone = ?2)
               AND (?3 IS NULL OR id <> ?3)
             LIMIT 1;"
        ))?;
        let mut rows = stmt.query(params![email, phone, exclude_id])?;
        match rows.next()? {
            Some(row) => Ok(Some(parse_student_row(row)?)),
            None => Ok(None),
        }
    }
}

impl EnrollmentRepository for SqliteStore {
    fn insert_assignment(&self, subject_id: &str, instructor_id: &str) -> RepoResult<Assignment> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO instructor_assignments (subject_id, instructor_id) VALUES (?1, ?2);",
            params![subject_id, instructor_id],
        )
        .map_err(map_write_error)?;
        Ok(Assignment {
            id: conn.last_insert_rowid(),
            subject_id: subject_id.to_string(),
            instructor_id: instructor_id.to_string(),
        })
    }

    fn get_assignment(&self, id: i64) -> RepoResult<Option<Assignment>> {
        let conn = self.conn.lock();
        let assignment = conn
            .query_row(
                "SELECT id, subject_id, instructor_id FROM instructor_assignments WHERE id = ?1;",
                [id],
                parse_assignment_row,
            )
            .optional()?;
        Ok(assignment)
    }

    fn find_assignment(
        &self,
        subject_id: &str,
        instructor_id: &str,
    ) -> RepoResult<Option<Assignment>> {
        let conn = self.conn.lock();
        let assignment = conn
            .query_row(
                "SELECT id, subject_id, instructor_id
                 FROM instructor_assignments
                 WHERE subject_id = ?1 AND instructor_id = ?2;",
                params![subject_id, instructor_id],
                parse_assignment_row,
            )
            .optional()?;
        Ok(assignment)
    }

    fn update_assignment(&self, assignment: &Assignment) -> RepoResult<()> {
        let conn = self.conn.lock();
        let changed = conn
            .execute(
                "UPDATE instructor_assignments
                 SET subject_id = ?2, instructor_id = ?3
                 WHERE id = ?1;",
                params![
                    assignment.id,
                    assignment.subject_id.as_str(),
                    assignment.instructor_id.as_str()
                ],
            )
            .map_err(map_write_error)?;
        ensure_changed(changed, "assignment", assignment.id.to_string())
    }

    fn delete_assignment(&self, id: i64) -> RepoResult<()> {
        let conn = self.conn.lock();
        let changed = conn.execute("DELETE FROM instructor_assignments WHERE id = ?1;", [id])?;
        ensure_changed(changed, "assignment", id.to_string())
    }

    fn insert_registration(&self, subject_id: &str, student_id: &str) -> RepoResult<Registration> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO student_registrations (subject_id, student_id) VALUES (?1, ?2);",
            params![subject_id, student_id],
        )
        .map_err(map_write_error)?;
        Ok(Registration {
            id: conn.last_insert_rowid(),
            subject_id: subject_id.to_string(),
            student_id: student_id.to_string(),
        })
    }

    fn get_registration(&self, id: i64) -> RepoResult<Option<Registration>> {
        let conn = self.conn.lock();
        let registration = conn
            .query_row(
                "SELECT id, subject_id, student_id FROM student_registrations WHERE id = ?1;",
                [id],
                parse_registration_row,
            )
            .optional()?;
        Ok(registration)
    }

    fn find_registration(
        &self,
        subject_id: &str,
        student_id: &str,
    ) -> RepoResult<Option<Registration>> {
        let conn = self.conn.lock();
        let registration = conn
            .query_row(
                "SELECT id, subject_id, student_id
                 FROM student_registrations
                 WHERE subject_id = ?1 AND student_id = ?2;",
                params![subject_id, student_id],
                parse_registration_row,
            )
            .optional()?;
        Ok(registration)
    }

    fn update_registration(&self, registration: &Registration) -> RepoResult<()> {
        let conn = self.conn.lock();
        let changed = conn
            .execute(
                "UPDATE student_registrations
                 SET subject_id = ?2, student_id = ?3
                 WHERE id = ?1;",
                params![
                    registration.id,
                    registration.subject_id.as_str(),
                    registration.student_id.as_str()
                ],
            )
            .map_err(map_write_error)?;
        ensure_changed(changed, "registration", registration.id.to_string())
    }

    fn delete_registration(&self, id: i64) -> RepoResult<()> {
        let conn = self.conn.lock();
        let changed = conn.execute("DELETE FROM student_registrations WHERE id = ?1;", [id])?;
        ensure_changed(changed, "registration", id.to_string())
    }

    fn insert_grade(&self, grade: &Grade) -> RepoResult<Grade> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT INTO grades (
                process_score,
                midterm_score,
                final_score,
                subject_id,
                student_id,
                by_instructor_id,
                created_at,
                updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                grade.scores.process,
                grade.scores.midterm,
                grade.scores.final_exam,
                grade.subject_id.as_str(),
                grade.student_id.as_str(),
                grade.by_instructor_id.as_str(),
                grade.created_at,
                grade.updated_at,
            ],
        )
        .map_err(map_write_error)?;

        let mut stored = grade.clone();
        stored.id = conn.last_insert_rowid();
        Ok(stored)
    }

    fn get_grade(&self, id: i64) -> RepoResult<Option<Grade>> {
        let conn = self.conn.lock();
        let grade = conn
            .query_row(
                &format!("{GRADE_SELECT_SQL} WHERE g.id = ?1;"),
                [id],
                parse_grade_row,
            )
            .optional()?;
        Ok(grade)
    }

    fn find_grade(&self, subject_id: &str, student_id: &str) -> RepoResult<Option<Grade>> {
        let conn = self.conn.lock();
        let grade = conn
            .query_row(
                &format!("{GRADE_SELECT_SQL} WHERE g.subject_id = ?1 AND g.student_id = ?2;"),
                params![subject_id, student_id],
                parse_grade_row,
            )
            .optional()?;
        Ok(grade)
    }

    fn count_grades_by_grader(&self, subject_id: &str, instructor_id: &str) -> RepoResult<usize> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM grades WHERE subject_id = ?1 AND by_instructor_id = ?2;",
            params![subject_id, instructor_id],
            |row| row.get(0),
        )?;
        narrow(count, "grades")
    }

    fn update_grade(&self, grade: &Grade) -> RepoResult<()> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "UPDATE grades
             SET
                process_score = ?2,
                midterm_score = ?3,
                final_score = ?4,
                updated_at = ?5
             WHERE id = ?1;",
            params![
                grade.id,
                grade.scores.process,
                grade.scores.midterm,
                grade.scores.final_exam,
                grade.updated_at,
            ],
        )?;
        ensure_changed(changed, "grade", grade.id.to_string())
    }

    fn delete_grade(&self, id: i64) -> RepoResult<()> {
        let conn = self.conn.lock();
        let changed = conn.execute("DELETE FROM grades WHERE id = ?1;", [id])?;
        ensure_changed(changed, "grade", id.to_string())
    }

    fn list_grades(&self, query: &GradeListQuery) -> RepoResult<Vec<Grade>> {
        let conn = self.conn.lock();
        let department_id = query.department_id.map(i64::from);
        let mut stmt = conn.prepare(&format!(
            "{GRADE_SELECT_SQL}
             JOIN subjects s ON s.id = g.subject_id
             WHERE (?1 IS NULL OR s.department_id = ?1)
             ORDER BY g.id ASC;"
        ))?;
        let mut rows = stmt.query([department_id])?;
        let mut grades = Vec::new();
        while let Some(row) = rows.next()? {
            grades.push(parse_grade_row(row)?);
        }
        Ok(grades)
    }
}

fn get_class_in(conn: &Connection, id: &str) -> RepoResult<Option<Class>> {
    let mut stmt = conn.prepare(&format!("{CLASS_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([id])?;
    match rows.next()? {
        Some(row) => Ok(Some(parse_class_row(row)?)),
        None => Ok(None),
    }
}

fn read_department_row(row: &Row<'_>) -> rusqlite::Result<(i64, String, String)> {
    Ok((row.get("id")?, row.get("symbol")?, row.get("name")?))
}

fn finish_department((id, symbol, name): (i64, String, String)) -> RepoResult<Department> {
    Ok(Department {
        id: narrow(id, "departments.id")?,
        symbol,
        name,
    })
}

fn parse_subject_row(row: &Row<'_>) -> RepoResult<Subject> {
    Ok(Subject {
        id: row.get("id")?,
        name: row.get("name")?,
        credits: narrow(row.get("credits")?, "subjects.credits")?,
        weights: GradeWeights {
            process: narrow(row.get("process_percentage")?, "subjects.process_percentage")?,
            midterm: narrow(row.get("midterm_percentage")?, "subjects.midterm_percentage")?,
            final_exam: narrow(row.get("final_percentage")?, "subjects.final_percentage")?,
        },
        department_id: narrow(row.get("department_id")?, "subjects.department_id")?,
    })
}

fn parse_instructor_row(row: &Row<'_>) -> RepoResult<Instructor> {
    Ok(Instructor {
        id: row.get("id")?,
        first_name: row.get("first_name")?,
        last_name: row.get("last_name")?,
        email: row.get("email")?,
        phone: row.get("phone")?,
        degree: row.get("degree")?,
        department_id: narrow(row.get("department_id")?, "instructors.department_id")?,
    })
}

fn parse_class_row(row: &Row<'_>) -> RepoResult<Class> {
    Ok(Class {
        id: row.get("id")?,
        name: row.get("name")?,
        max_students: narrow(row.get("max_students")?, "classes.max_students")?,
        academic_year: row.get("academic_year")?,
        department_id: narrow(row.get("department_id")?, "classes.department_id")?,
        host_instructor_id: row.get("host_instructor_id")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn parse_student_row(row: &Row<'_>) -> RepoResult<Student> {
    let birth_day_text: String = row.get("birth_day")?;
    let birth_day = NaiveDate::parse_from_str(&birth_day_text, BIRTH_DAY_FORMAT).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid date `{birth_day_text}` in students.birth_day"
        ))
    })?;

    Ok(Student {
        id: row.get("id")?,
        first_name: row.get("first_name")?,
        last_name: row.get("last_name")?,
        email: row.get("email")?,
        phone: row.get("phone")?,
        birth_day,
        academic_year: row.get("academic_year")?,
        class_id: row.get("class_id")?,
        department_id: narrow(row.get("department_id")?, "students.department_id")?,
    })
}

fn parse_assignment_row(row: &Row<'_>) -> rusqlite::Result<Assignment> {
    Ok(Assignment {
        id: row.get("id")?,
        subject_id: row.get("subject_id")?,
        instructor_id: row.get("instructor_id")?,
    })
}

fn parse_registration_row(row: &Row<'_>) -> rusqlite::Result<Registration> {
    Ok(Registration {
        id: row.get("id")?,
        subject_id: row.get("subject_id")?,
        student_id: row.get("student_id")?,
    })
}

fn parse_grade_row(row: &Row<'_>) -> rusqlite::Result<Grade> {
    Ok(Grade {
        id: row.get("id")?,
        scores: GradeScores {
            process: row.get("process_score")?,
            midterm: row.get("midterm_score")?,
            final_exam: row.get("final_score")?,
        },
        subject_id: row.get("subject_id")?,
        student_id: row.get("student_id")?,
        by_instructor_id: row.get("by_instructor_id")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}

fn narrow<T: TryFrom<i64>>(value: i64, column: &str) -> RepoResult<T> {
    T::try_from(value)
        .map_err(|_| RepoError::InvalidData(format!("value `{value}` out of range in {column}")))
}

fn ensure_changed(changed: usize, entity: &'static str, id: String) -> RepoResult<()> {
    if changed == 0 {
        return Err(RepoError::NotFound { entity, id });
    }
    Ok(())
}

fn map_write_error(err: rusqlite::Error) -> RepoError {
    if let rusqlite::Error::SqliteFailure(failure, Some(message)) = &err {
        if matches!(
            failure.extended_code,
            ffi::SQLITE_CONSTRAINT_UNIQUE | ffi::SQLITE_CONSTRAINT_PRIMARYKEY
        ) {
            let constraint = message
                .strip_prefix("UNIQUE constraint failed: ")
                .unwrap_or(message)
                .to_string();
            return RepoError::Conflict { constraint };
        }
    }
    err.into()
}

fn ensure_store_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }
    Ok(())
}
