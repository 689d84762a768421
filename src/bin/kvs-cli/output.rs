//! Human-readable rendering of batch outcomes.

use kvs_client::{BatchOutcome, MapValue, OpResult, Params, Value};

/// Values printable as a result line.
pub trait Render: std::fmt::Debug {
    fn render(&self) -> String;
}

macro_rules! render_display {
    ($($ty:ty),*) => {
        $(impl Render for $ty {
            fn render(&self) -> String {
                self.to_string()
            }
        })*
    };
}

render_display!(i32, u32, u64, f32, bool, String);

impl Render for () {
    fn render(&self) -> String {
        String::new()
    }
}

impl Render for MapValue {
    fn render(&self) -> String {
        Value::Map(self.clone()).to_string()
    }
}

/// What a successful result line shows.
#[derive(Clone, Copy, Debug)]
pub enum Line {
    /// `key "<k>", value: <v>`
    Value,
    /// `key "<k>", status: <s>`
    Status,
    /// `key: "<k>", deleted: <b>`
    Deleted,
}

/// The key of a storage call, or the argument of a diagnostic one.
fn label(params: &Params) -> String {
    match (&params.key, &params.value) {
        (Some(key), _) => key.clone(),
        (None, Some(value)) => value.to_string(),
        (None, None) => "none".to_owned(),
    }
}

fn format_result<T: Render>(result: &OpResult<T>, line: Line) -> String {
    let Some(value) = result.value() else {
        return result.to_string();
    };
    let key = label(result.params());
    match line {
        Line::Value => format!("key \"{key}\", value: {}", value.render()),
        Line::Status => format!("key \"{key}\", status: {}", result.status()),
        Line::Deleted => format!("key: \"{key}\", deleted: {}", value.render()),
    }
}

pub fn format_outcome<T: Render>(command: &str, outcome: &BatchOutcome<T>, line: Line) -> String {
    match outcome {
        BatchOutcome::Completed(result) => format_result(result, line),
        BatchOutcome::Failed { params, error } => {
            format!("key \"{}\" failed: {error}", label(params))
        }
        BatchOutcome::Cancelled { params, elapsed } => format!(
            "Task {command}({}) was canceled, elapsed time {:.2}s",
            label(params),
            elapsed.as_secs_f64()
        ),
    }
}

pub fn print_outcomes<T: Render>(command: &str, outcomes: &[BatchOutcome<T>], line: Line) {
    for outcome in outcomes {
        println!("{}", format_outcome(command, outcome, line));
    }
}
