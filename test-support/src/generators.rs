//! Realistic random task data using the `fake` crate, for tests that need
//! variety rather than fixed fixtures.

use fake::faker::lorem::en::{Paragraph, Sentence};
use fake::Fake;
use rand::Rng;

/// A short, sentence-like task name.
pub fn generate_task_name() -> String {
    let name: String = Sentence(3..7).fake();
    name.trim_end_matches('.').to_string()
}

/// A paragraph-length task description.
pub fn generate_task_description() -> String {
    Paragraph(1..3).fake()
}

/// A priority in the valid `[0, 100]` range, weighted toward common values.
pub fn generate_priority() -> i32 {
    let common = [1, 1, 1, 2, 3, 5, 10];
    common[rand::thread_rng().gen_range(0..common.len())]
}
