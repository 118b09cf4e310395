mod common;
mod evaluation;
mod properties;
mod service;
