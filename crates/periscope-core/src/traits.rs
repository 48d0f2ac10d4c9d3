use std::future::Future;

use crate::error::AppError;
use crate::models::ExtractionResult;

/// One persistent automation session (a browser tab, a remote driver, ...).
///
/// The core only ever talks to a session through these six operations.
/// Methods take `&mut self`: a session is owned by exactly one worker and is
/// never shared.
pub trait SearchSession: Send + 'static {
    /// Handle to the query input control.
    type Input: Send + Sync;

    fn navigate(&mut self, url: &str) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Looks up the query input. `Ok(None)` means it is not on the page (yet).
    fn locate_input(
        &mut self,
    ) -> impl Future<Output = Result<Option<Self::Input>, AppError>> + Send;

    /// Types `text` into the input and triggers the search.
    fn submit(
        &mut self,
        input: &Self::Input,
        text: &str,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    fn read_rendered_markup(&mut self) -> impl Future<Output = Result<String, AppError>> + Send;

    /// Returns the session to its start page.
    fn reset_session(&mut self) -> impl Future<Output = Result<(), AppError>> + Send;

    fn close_session(&mut self) -> impl Future<Output = Result<(), AppError>> + Send;
}

/// Turns rendered markup into a structured result.
///
/// Implementations must be pure: no I/O, no session access.
pub trait MarkupParser: Send + Sync + Clone + 'static {
    fn parse(&self, markup: &str) -> Result<ExtractionResult, AppError>;
}
