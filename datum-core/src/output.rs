//! Presentation hooks fired by the control layer.
//!
//! Calls are fire-and-forget: nothing in the control layer depends on what a
//! presenter does with them.

use crate::document::{Document, Payload};

pub trait DocOutput {
    /// A document was found (lookup) or already occupies a target id.
    fn show_exists(&self, _doc: &Document) {}

    /// An update merged to identical content and was not written.
    fn show_no_diff(&self, _doc: &Document) {}

    fn show_create(&self, _doc: &Document) {}

    fn show_update(&self, _before: &Document, _after: &Document) {}

    fn show_rename(&self, _old_id: &str, _new_id: &str) {}

    fn show_delete(&self, _doc: &Document) {}

    /// A write was abandoned; `payload` is what would have been stored.
    fn show_failed(&self, _payload: &Payload) {}
}

/// Presenter that ignores every notification.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOutput;

impl DocOutput for NoOutput {}
