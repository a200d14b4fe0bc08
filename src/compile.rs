use std::io;

use bumpalo::Bump;
use hashbrown::HashMap;
use mjc_core::asm::CodeStream;
use mjc_core::ast::{DeclId, Program, Stmt, StmtKind};
use mjc_core::{CodeGenerator, CodegenError, TargetConfig, read_program};

use crate::Error;

/// Options for a single compilation.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompileOptions {
    /// Append the source span each line was generated from as a comment.
    pub source_positions: bool,
}

/// Frame offset assigned to one local variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalOffset {
    pub name: String,
    pub id: DeclId,
    pub offset: i32,
}

/// Result of compiling a tree dump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compilation {
    /// The assembly listing, one line per instruction, label or directive.
    pub assembly: String,
    /// Offsets of every local, ordered by declaration id.
    pub offsets: Vec<LocalOffset>,
}

impl Compilation {
    /// Offset of the first local called `name`.
    pub fn offset_of(&self, name: &str) -> Option<i32> {
        self.offsets
            .iter()
            .find(|local| local.name == name)
            .map(|local| local.offset)
    }

    pub fn offset_of_id(&self, id: DeclId) -> Option<i32> {
        self.offsets
            .iter()
            .find(|local| local.id == id)
            .map(|local| local.offset)
    }
}

/// Read a tree dump and generate assembly for it.
pub fn compile(source: &str, config: &TargetConfig) -> Result<Compilation, Error> {
    compile_with_options(source, config, CompileOptions::default())
}

pub fn compile_with_options(
    source: &str,
    config: &TargetConfig,
    options: CompileOptions,
) -> Result<Compilation, Error> {
    config.validate()?;

    let arena = Bump::new();
    let program = read_program(&arena, source)
        .map_err(|err| Error::compilation(source, err.to_diagnostic()))?;

    let sink = CodeStream::new(Vec::new()).with_source_positions(options.source_positions);
    let (sink, offsets) =
        CodeGenerator::compile(config, sink, program).map_err(|err| match err {
            CodegenError::Sink(err) => Error::Io(err),
            other => Error::compilation(source, other.to_diagnostic()),
        })?;
    let assembly = String::from_utf8(sink.into_inner())
        .map_err(|err| io::Error::new(io::ErrorKind::InvalidData, err))?;

    let names = local_names(program);
    let offsets = offsets
        .sorted()
        .into_iter()
        .map(|(id, offset)| LocalOffset {
            name: names.get(&id).map(|name| name.to_string()).unwrap_or_default(),
            id,
            offset,
        })
        .collect();

    Ok(Compilation { assembly, offsets })
}

/// Names of all local declarations in the program, by id.
fn local_names<'a>(program: &Program<'a>) -> HashMap<DeclId, &'a str> {
    fn visit<'a>(stmt: &Stmt<'a>, names: &mut HashMap<DeclId, &'a str>) {
        match stmt.kind {
            StmtKind::LocalVar(decl) => {
                names.insert(decl.id, decl.name);
            }
            StmtKind::Block(stmts) => stmts.iter().for_each(|stmt| visit(stmt, names)),
            StmtKind::Call(_) => {}
        }
    }

    let mut names = HashMap::new();
    visit(program.main, &mut names);
    for method in program.classes.iter().flat_map(|class| class.methods) {
        method.body.iter().for_each(|stmt| visit(stmt, &mut names));
    }
    names
}
