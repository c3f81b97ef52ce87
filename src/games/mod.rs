//! Reference game definitions.

pub mod tictactoe;
