use fieldmark_common::FieldKind;

/// Outcome of asking which field a clicked element belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    Field(FieldKind),
    Aborted,
}

/// Decides the field for a candidate selection. Called synchronously from
/// the click handler, so it may block (e.g. on a confirmation prompt).
pub trait FieldClassifier {
    fn classify(&mut self, candidate_text: &str, hint: Option<FieldKind>) -> Classification;
}

impl<F> FieldClassifier for F
where
    F: FnMut(&str, Option<FieldKind>) -> Classification,
{
    fn classify(&mut self, candidate_text: &str, hint: Option<FieldKind>) -> Classification {
        self(candidate_text, hint)
    }
}

/// Takes the mode the session was enabled with. Without one there is no
/// way to decide, so the click is aborted.
#[derive(Debug, Clone, Copy, Default)]
pub struct HintClassifier;

impl FieldClassifier for HintClassifier {
    fn classify(&mut self, _candidate_text: &str, hint: Option<FieldKind>) -> Classification {
        match hint {
            Some(kind) => Classification::Field(kind),
            None => Classification::Aborted,
        }
    }
}

/// Yes/no prompt: "is this the job title?". `Some(true)` picks the job
/// title, `Some(false)` the company name and `None` (dismissed) aborts.
pub struct ConfirmClassifier<F> {
    confirm: F,
}

impl<F> ConfirmClassifier<F>
where
    F: FnMut(&str) -> Option<bool>,
{
    pub fn new(confirm: F) -> Self {
        Self { confirm }
    }
}

impl<F> FieldClassifier for ConfirmClassifier<F>
where
    F: FnMut(&str) -> Option<bool>,
{
    fn classify(&mut self, candidate_text: &str, _hint: Option<FieldKind>) -> Classification {
        match (self.confirm)(candidate_text) {
            Some(true) => Classification::Field(FieldKind::JobTitle),
            Some(false) => Classification::Field(FieldKind::CompanyName),
            None => Classification::Aborted,
        }
    }
}
