//! Timetable domain models.
//!
//! Value types for the weekly grid and its contents, the read-only
//! school data, and the rule configuration.
//!
//! # Domain Mappings
//!
//! | u-timetable | School |
//! |-------------|--------|
//! | TimeSlot | Day × period |
//! | ClassRef | Homeroom class |
//! | Assignment | Lesson (subject + teacher) |
//! | Schedule | Weekly timetable |
//! | Rules | School policy (caps, groups, pairings) |

mod calendar;
mod entity;
mod rules;
mod schedule;
mod school;
mod time_slot;

pub use calendar::AbsenceCalendar;
pub use entity::{Assignment, ClassRef, Subject, Teacher};
pub use rules::{CheckLevel, ExchangePair, Rules, TeacherSlotLimit};
pub use schedule::{Cell, Schedule, Violation, ViolationKind};
pub use school::{School, SubjectRequirement};
pub use time_slot::{Day, TimeSlot, DAYS_PER_WEEK, PERIODS_PER_DAY, SLOTS_PER_WEEK};
