//! Typed context references and their canonical text encodings.
//!
//! A [`ContextReference`] is what a chip in the composer points at: a file, a
//! folder, a web page, a symbol, an image, or one of the singleton markers
//! such as the terminal or the git working tree. References travel inside
//! message text, so each one has two encodings:
//!
//! * a URI (`claude-context://<kind>/<segment>[?param=value&...][#L<line>[:<col>]]`),
//!   see [`encode_reference`] and [`decode_reference`];
//! * inline markup (`[@<label>](<uri>)`), see [`render_inline_markup`] and
//!   [`parse_inline_references`].

mod codec;
mod markup;
mod reference;

pub use codec::REFERENCE_SCHEME;
pub use codec::ReferenceUriError;
pub use codec::decode_reference;
pub use codec::encode_reference;
pub use codec::parse_reference_uri;
pub use markup::InlineReference;
pub use markup::parse_inline_references;
pub use markup::render_inline_markup;
pub use reference::ContextReference;
pub use reference::ReferenceKind;
