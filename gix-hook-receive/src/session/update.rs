use super::Session;
use crate::backend::Backend;
use crate::protocol::{is_empty_object_id, RefName};
use crate::Error;

impl<B: Backend> Session<B> {
    /// Check a single update, given as `<ref> <old-oid> <new-oid>` in `args`.
    ///
    /// Pull request references are maintained by the forge and can't be changed by pushes. Everything
    /// else, including calls with unexpected arguments, passes.
    pub fn update(&mut self, args: &[String]) -> Result<(), Error> {
        if self.ctx.is_internal {
            return Ok(());
        }
        let [name, _old, new] = args else {
            tracing::debug!(args = args.len(), "unexpected update hook arguments");
            return Ok(());
        };
        let name = RefName::new(name.as_str());
        if !name.is_pull() {
            return Ok(());
        }
        let action = if is_empty_object_id(new) {
            "deletion"
        } else {
            "modification"
        };
        Err(Error::InternalRef {
            message: format!("The {action} of {name} is skipped as it's an internal reference."),
        })
    }
}
