#![doc = include_str!("../../../README.md")]

mod ast;
mod error;
mod frame;
mod interp;
mod io;
mod natives;
mod parse;
mod registry;
mod resource;
mod run;
mod tracer;
mod value;

pub use crate::{
    error::Exception,
    io::{CollectStringPrint, EmptyReader, LineReader, NoPrint, PrintWriter, QueueReader, StdPrint, StdinReader},
    resource::{LimitedTracker, NoLimitTracker, ResourceError, ResourceTracker},
    run::Runner,
    tracer::{NoopTracer, SendTracer, StderrTracer},
};
