//! `boardroom-boards`: boards, memberships and the operations over them.

pub mod board;
pub mod service;
pub mod store;

pub use board::{Board, BoardUsers, MAX_BOARD_NAME_LEN, NewBoard};
pub use service::{BoardError, BoardService};
pub use store::{BoardStore, MutationOutcome};
