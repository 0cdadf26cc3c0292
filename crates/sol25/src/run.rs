//! Public interface for running SOL25 programs.

use serde::{Deserialize, Serialize};

use crate::{
    ast::Program,
    error::{Exception, RunError, RunResult},
    interp::{Interp, instantiate},
    io::{LineReader, PrintWriter},
    parse::parse_program,
    registry::ClassRegistry,
    resource::{NoLimitTracker, ResourceTracker},
    tracer::{NoopTracer, SendTracer},
};

/// Primary interface for running SOL25 programs.
///
/// A `Runner` holds a loaded program: the typed AST plus the class registry
/// with all built-in and user classes registered. Loading happens once in
/// [`Runner::new`]; execution can then be repeated with different readers
/// and writers.
///
/// # Example
/// ```
/// use sol25::{CollectStringPrint, EmptyReader, Runner};
///
/// let xml = r#"<program>
///   <class name="Main" parent="Object">
///     <method selector="run">
///       <block arity="0">
///         <assign order="1">
///           <var name="x"/>
///           <expr><literal class="Integer" value="41"/></expr>
///         </assign>
///         <assign order="2">
///           <var name="y"/>
///           <expr>
///             <send selector="print">
///               <expr>
///                 <send selector="asString">
///                   <expr>
///                     <send selector="plus:">
///                       <expr><var name="x"/></expr>
///                       <arg order="1"><expr><literal class="Integer" value="1"/></expr></arg>
///                     </send>
///                   </expr>
///                 </send>
///               </expr>
///             </send>
///           </expr>
///         </assign>
///       </block>
///     </method>
///   </class>
/// </program>"#;
///
/// let runner = Runner::new(xml).unwrap();
/// let mut print = CollectStringPrint::new();
/// runner.run(&mut EmptyReader, &mut print).unwrap();
/// assert_eq!(print.output(), "42");
/// ```
#[derive(Debug, Serialize, Deserialize)]
pub struct Runner {
    program: Program,
    registry: ClassRegistry,
}

impl Runner {
    /// Loads a program from the XML form of its AST.
    ///
    /// Structural violations of the document are classified as internal
    /// errors (the front-end parser is expected to have validated the
    /// program); duplicate user class names are semantic errors.
    pub fn new(xml: &str) -> Result<Self, Exception> {
        let program = parse_program(xml).map_err(|err| Exception::new(99, err.to_string()))?;
        let mut registry = ClassRegistry::with_builtins();
        registry.load(&program).map_err(Exception::from)?;
        Ok(Self { program, registry })
    }

    /// Executes the program to completion with no resource limits and no
    /// tracing.
    pub fn run(&self, reader: &mut impl LineReader, print: &mut impl PrintWriter) -> Result<(), Exception> {
        self.run_with(reader, print, NoLimitTracker, NoopTracer)
    }

    /// Executes the program with an explicit resource tracker and tracer.
    ///
    /// Locates the class `Main`, resolves its (possibly inherited)
    /// parameterless method `run`, creates a fresh `Main` instance and
    /// executes the method body. Program output goes through `print`,
    /// `String read` pulls lines from `reader`.
    pub fn run_with(
        &self,
        reader: &mut impl LineReader,
        print: &mut impl PrintWriter,
        tracker: impl ResourceTracker,
        tracer: impl SendTracer,
    ) -> Result<(), Exception> {
        self.execute(reader, print, tracker, tracer).map_err(Exception::from)
    }

    fn execute(
        &self,
        reader: &mut impl LineReader,
        print: &mut impl PrintWriter,
        tracker: impl ResourceTracker,
        tracer: impl SendTracer,
    ) -> RunResult<()> {
        if !self.registry.contains("Main") {
            return Err(RunError::Semantic("class Main is not defined".to_owned()));
        }
        let body = self
            .registry
            .resolve_method("Main", "run")?
            .ok_or_else(|| RunError::Semantic("class Main has no method 'run'".to_owned()))?;
        if self.program.blocks.get(body).arity() != 0 {
            return Err(RunError::Semantic("method 'run' of class Main must take no parameters".to_owned()));
        }

        let main = instantiate(&self.registry, "Main")?;
        let mut interp = Interp::new(&self.program, &self.registry, reader, print, tracker, tracer);
        let result = interp.call_block(body, Some(main), &[], "Main", false);

        // every push must have been matched by a pop, on success and on
        // error unwind alike
        if interp.depth() != 0 {
            return Err(RunError::internal(format!("{} frames leaked after execution", interp.depth())));
        }
        result.map(|_| ())
    }

    /// Serializes the loaded program to a binary format.
    ///
    /// The serialized data can be stored and later restored with
    /// [`Runner::load`], avoiding re-parsing the XML document.
    pub fn dump(&self) -> Result<Vec<u8>, postcard::Error> {
        postcard::to_allocvec(self)
    }

    /// Deserializes a runner from the binary format produced by
    /// [`Runner::dump`].
    pub fn load(bytes: &[u8]) -> Result<Self, postcard::Error> {
        postcard::from_bytes(bytes)
    }
}
