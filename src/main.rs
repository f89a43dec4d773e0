use clap::{Parser, Subcommand};
use std::fs;
use std::process::ExitCode;

use wabin::parser;
use wabin::parser::instruction;
use wabin::parser::module::{val_type_name, Module};

#[derive(Parser)]
#[command(name = "wabin")]
#[command(about = "WebAssembly binary module toolkit")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode modules and print every field
    Dump {
        /// Paths to WebAssembly modules
        files: Vec<String>,
    },
}

fn main() -> ExitCode {
    env_logger::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Dump { files } => {
            for file in &files {
                if let Err(code) = dump_module(file) {
                    return code;
                }
            }
            ExitCode::SUCCESS
        }
    }
}

fn dump_module(file: &str) -> Result<(), ExitCode> {
    let bytes = match fs::read(file) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("Error reading {file}: {e}");
            return Err(ExitCode::FAILURE);
        }
    };

    let module = match parser::parse(&bytes) {
        Ok(m) => m,
        Err(e) => {
            eprintln!("Error decoding {file}: {e}");
            return Err(ExitCode::FAILURE);
        }
    };

    print_module(file, &module);
    Ok(())
}

fn print_module(file: &str, module: &Module) {
    println!(
        "{file}: version {} start {} data_count {} sections {:?}",
        module.version, module.start, module.data_count, module.sections
    );

    for (i, import) in module.imports.iter().enumerate() {
        println!(
            "import[{i}] {}::{} {}",
            String::from_utf8_lossy(&import.module),
            String::from_utf8_lossy(&import.name),
            import.desc
        );
    }

    for (i, fn_type) in module.types.iter().enumerate() {
        println!("type[{i}] {fn_type}");
    }

    for (i, idx) in module.functions.iter().enumerate() {
        println!("function[{i}] type[{idx}]");
    }

    for (i, table) in module.tables.iter().enumerate() {
        println!("table[{i}] {} {}", val_type_name(table.ty), table.limits);
    }

    for (i, limits) in module.memories.iter().enumerate() {
        println!("memory[{i}] {limits}");
    }

    for (i, global) in module.globals.iter().enumerate() {
        println!(
            "global[{i}] {} {} expr {}",
            val_type_name(global.ty),
            if global.mutable != 0 { "var" } else { "const" },
            hex::encode(&global.expr)
        );
    }

    for (i, export) in module.exports.iter().enumerate() {
        println!(
            "export[{i}] {} kind {} index {}",
            String::from_utf8_lossy(&export.name),
            export.kind,
            export.index
        );
    }

    for (i, element) in module.elements.iter().enumerate() {
        println!(
            "element[{i}] {} expr {} funcs {:?}",
            val_type_name(element.ty),
            hex::encode(&element.expr),
            element.funcs
        );
    }

    for (i, body) in module.code.iter().enumerate() {
        match instruction::parse_function(body) {
            Ok(func) => {
                let locals: Vec<&str> = func.locals.iter().map(|tp| val_type_name(*tp)).collect();
                println!(
                    "code[{i}] locals {:?} expr {}",
                    locals,
                    hex::encode(&func.expr)
                );
            }
            Err(e) => println!("code[{i}] {} error: {e}", hex::encode(body)),
        }
    }

    for (i, data) in module.data.iter().enumerate() {
        println!(
            "data[{i}] expr {} init {}",
            hex::encode(&data.expr),
            hex::encode(&data.init)
        );
    }

    for (i, custom) in module.customs.iter().enumerate() {
        println!(
            "custom[{i}] {} data {}",
            String::from_utf8_lossy(&custom.name),
            hex::encode(&custom.data)
        );
    }
}
