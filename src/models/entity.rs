//! Entity value types: classes, subjects, teachers, assignments.
//!
//! All types compare by value. Names are opaque strings; the engine
//! never interprets them; which subjects are protected, individualized
//! or core is decided by [`Rules`](super::Rules).

use serde::{Deserialize, Serialize};
use std::fmt;

/// A class (homeroom) identified by grade and class number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ClassRef {
    /// School grade (year).
    pub grade: u8,
    /// Class number within the grade.
    pub class_number: u8,
}

impl ClassRef {
    /// Creates a class reference.
    pub fn new(grade: u8, class_number: u8) -> Self {
        Self {
            grade,
            class_number,
        }
    }
}

impl fmt::Display for ClassRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.grade, self.class_number)
    }
}

/// A school subject.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Subject(String);

impl Subject {
    /// Creates a subject from its name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Subject name.
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Subject {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// A teacher.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Teacher(String);

impl Teacher {
    /// Creates a teacher from their name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Teacher name.
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Teacher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Teacher {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Content of one schedule cell: a class taking a subject, usually
/// with a teacher.
///
/// The teacher is optional only for protected subjects (homeroom,
/// ceremonies, exams) that have no specific instructor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Assignment {
    /// Class receiving the lesson.
    pub class_ref: ClassRef,
    /// Subject taught.
    pub subject: Subject,
    /// Instructor, if any.
    pub teacher: Option<Teacher>,
}

impl Assignment {
    /// Creates a taught assignment.
    pub fn new(class_ref: ClassRef, subject: impl Into<Subject>, teacher: impl Into<Teacher>) -> Self {
        Self {
            class_ref,
            subject: subject.into(),
            teacher: Some(teacher.into()),
        }
    }

    /// Creates an assignment without an instructor.
    pub fn untaught(class_ref: ClassRef, subject: impl Into<Subject>) -> Self {
        Self {
            class_ref,
            subject: subject.into(),
            teacher: None,
        }
    }

    /// Same subject and teacher, moved to another class.
    pub fn for_class(&self, class_ref: ClassRef) -> Self {
        Self {
            class_ref,
            subject: self.subject.clone(),
            teacher: self.teacher.clone(),
        }
    }

    /// Whether this assignment is taught by `teacher`.
    #[inline]
    pub fn is_taught_by(&self, teacher: &Teacher) -> bool {
        self.teacher.as_ref() == Some(teacher)
    }
}

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.teacher {
            Some(t) => write!(f, "{} {} ({})", self.class_ref, self.subject, t),
            None => write!(f, "{} {}", self.class_ref, self.subject),
        }
    }
}
