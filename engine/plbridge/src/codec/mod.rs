//! Translation between host values and engine terms.
//!
//! | host value                     | term                                        |
//! |--------------------------------|---------------------------------------------|
//! | `Null`, empty vector           | `[]`                                        |
//! | length-1 vector (`scalar`)     | bare number, string, `true`/`false`         |
//! | vector                         | `#(1.0, 2.0)`, `%(1, na)`, `$$("a")`, `!(true)` |
//! | matrix                         | `##(2, 2, [], [], data(#(..), #(..)))`      |
//! | missing element                | `na`                                        |
//! | symbol                         | atom                                        |
//! | variable reference             | variable (atom when `atomize`)              |
//! | call `f(x, k = v)`             | `f(x, k = v)`                               |
//! | list `list(a = 1, 2)`          | `[a - 1, 2]`                                |
//! | closure `function(x) body`     | `function(x) :- body`                       |
//!
//! Vector and matrix functors come from [`CodecOptions`](crate::CodecOptions).

mod decode;
mod encode;

pub use decode::decode;
pub use encode::encode;

/// Functor wrapping a named call argument, `name = value`.
pub const NAMED_ARG_FUNCTOR: &str = "=";
/// Functor wrapping a named list entry, `name - value`.
pub const PAIR_FUNCTOR: &str = "-";
/// Functor joining a closure head and body.
pub const NECK_FUNCTOR: &str = ":-";
/// Functor of a closure head.
pub const FUNCTION_FUNCTOR: &str = "function";
/// Functor holding the rows of an encoded matrix.
pub const DATA_FUNCTOR: &str = "data";
