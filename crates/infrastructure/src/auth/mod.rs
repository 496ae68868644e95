//! Identity provider adapters.

mod oauth2_exchanger;

pub use oauth2_exchanger::{ClientAuth, OAuth2TokenExchanger, TokenResponseFields};
