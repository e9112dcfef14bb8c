#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, strum_macros::Display)]
pub enum Command {
    Save,
    Delete,
    Close,
}
