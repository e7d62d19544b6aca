#![allow(clippy::cast_precision_loss, clippy::float_cmp)]

mod acquisition;
mod builder;
mod fakes;
mod hooks;
mod sequential;
