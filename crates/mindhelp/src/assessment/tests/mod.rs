mod common;
mod presenter;
mod routing;
mod store;
