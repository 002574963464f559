//! Folio Bot: a portfolio chatbot.
//!
//! Two independent chat paths share one HTTP listener:
//!
//! - **canned**: keyword topic classification answered from fixed documents,
//!   with every exchange recorded in a session ledger ([`ledger`]).
//! - **rag**: questions answered by an LLM over context retrieved from a
//!   local knowledge index ([`knowledge`], [`rag`]).

pub mod canned;
pub mod config;
pub mod error;
pub mod http;
pub mod knowledge;
pub mod ledger;
pub mod llm;
pub mod logger;
pub mod rag;
