//! Identifiers of the interactive controls the bot publishes and dispatches on.

pub const CREATE_TICKET: &str = "create_ticket";
pub const HANDLE_TICKET: &str = "handle_ticket";
pub const CLOSE_TICKET: &str = "close_ticket";
pub const QUERY_STAFF: &str = "query_staff";
pub const STAFF_QUERY_MODAL: &str = "staff_query_modal";
pub const STAFF_ID_INPUT: &str = "staff_id_input";
