//! Per-language toolchains for the local sandbox runner
//!
//! Command templates may contain placeholders, substituted per run:
//! `{src}` source file path, `{bin}` compiled binary path, `{dir}` working
//! directory, `{class}` Java public class name.

pub mod c;
pub mod cpp;
pub mod java;
pub mod javascript;
pub mod python;

use std::path::Path;

use crate::models::Language;

/// How to build and start a program in one language
#[derive(Debug, Clone)]
pub struct Toolchain {
    source_file: String,
    compile_command: Option<Vec<String>>,
    run_command: Vec<String>,
}

/// Values substituted into command templates
#[derive(Debug, Clone)]
pub struct Placeholders<'a> {
    pub workdir: &'a Path,
    pub class_name: &'a str,
}

impl Toolchain {
    pub fn new(source_file: &str, compile_command: Option<&[&str]>, run_command: &[&str]) -> Self {
        Self {
            source_file: source_file.to_string(),
            compile_command: compile_command.map(to_owned_args),
            run_command: to_owned_args(run_command),
        }
    }

    /// Default toolchain for a supported language
    pub fn for_language(language: Language) -> Self {
        match language {
            Language::Python => python::toolchain(),
            Language::JavaScript => javascript::toolchain(),
            Language::C => c::toolchain(),
            Language::Cpp => cpp::toolchain(),
            Language::Java => java::toolchain(),
        }
    }

    /// Name of the file the source is written to
    pub fn source_file(&self, vars: &Placeholders<'_>) -> String {
        self.source_file.replace("{class}", vars.class_name)
    }

    /// Compile argv, `None` for interpreted languages
    pub fn compile_command(&self, vars: &Placeholders<'_>) -> Option<Vec<String>> {
        self.compile_command
            .as_ref()
            .map(|argv| self.expand_all(argv, vars))
    }

    pub fn run_command(&self, vars: &Placeholders<'_>) -> Vec<String> {
        self.expand_all(&self.run_command, vars)
    }

    fn expand_all(&self, argv: &[String], vars: &Placeholders<'_>) -> Vec<String> {
        let dir = vars.workdir.display().to_string();
        let src = vars.workdir.join(self.source_file(vars)).display().to_string();
        let bin = vars.workdir.join("main").display().to_string();
        argv.iter()
            .map(|arg| {
                arg.replace("{src}", &src)
                    .replace("{bin}", &bin)
                    .replace("{dir}", &dir)
                    .replace("{class}", vars.class_name)
            })
            .collect()
    }
}

fn to_owned_args(args: &[&str]) -> Vec<String> {
    args.iter().map(|a| a.to_string()).collect()
}
