use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::info;
use std::{fs, path::PathBuf};
use wasmgate::{
    Module, Section, ValModule, ValidateOptions,
    binary::{section::CustomPayload, types::ImportDesc},
};

#[derive(Parser)]
#[command(name = "wasmgate")]
#[command(about = "Inspect WebAssembly modules and canonicalize eWASM contracts")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the header and a summary of every section
    Dump { file: PathBuf },

    /// Validate a contract and write its canonical bytes
    Validate {
        file: PathBuf,

        /// Directory the canonical module is written to
        #[arg(long, default_value = "/tmp")]
        out: PathBuf,

        /// Accept modules with custom sections (they are still stripped)
        #[arg(long)]
        allow_custom: bool,
    },
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Dump { file } => dump(file),
        Commands::Validate {
            file,
            out,
            allow_custom,
        } => validate(file, out, ValidateOptions { allow_custom }),
    }
}

fn dump(file: PathBuf) -> Result<()> {
    let wasm = fs::read(&file).with_context(|| format!("failed to read {}", file.display()))?;
    let module = Module::new(&wasm).with_context(|| format!("failed to decode {}", file.display()))?;

    println!(
        "module header: magic={:?} version={}",
        module.header.magic, module.header.version
    );
    println!("#sections: {}", module.sections.len());

    for section in &module.sections {
        println!(
            "section: {:2} ({:?}) {} entries",
            section.code() as u8,
            section.code(),
            section.len()
        );
        match section {
            Section::Type(types) => {
                for (i, ty) in types.iter().enumerate() {
                    println!("    type[{}]: {}", i, ty);
                }
            }
            Section::Import(imports) => {
                for import in imports {
                    let desc = match &import.desc {
                        ImportDesc::Func(idx) => format!("type {}", idx),
                        other => other.kind().to_string(),
                    };
                    println!("    import {:?}.{:?} {}", import.module, import.field, desc);
                }
            }
            Section::Export(exports) => {
                for export in exports {
                    println!("    export {} {} @{}", export.field, export.kind, export.index);
                }
            }
            Section::Start(idx) => println!("    start: {}", idx),
            Section::Custom(custom) => match &custom.payload {
                CustomPayload::Name(names) => {
                    if let Some(name) = &names.module_name {
                        println!("    module name: {}", name);
                    }
                    for func in &names.function_names {
                        println!("    func[{}]: {}", func.index, func.name);
                    }
                }
                CustomPayload::Raw(bytes) => {
                    println!("    name: {:?}, size: {}", custom.name, bytes.len())
                }
            },
            _ => {}
        }
    }

    Ok(())
}

fn validate(file: PathBuf, out: PathBuf, options: ValidateOptions) -> Result<()> {
    let wasm = fs::read(&file).with_context(|| format!("failed to read {}", file.display()))?;
    let module = ValModule::read(&wasm).context("read and validate module")?;
    module.validate_with(&options).context("module validate")?;

    let name = file
        .file_name()
        .with_context(|| format!("{} has no file name", file.display()))?;
    let dest = out.join(name);
    fs::write(&dest, module.bytes())
        .with_context(|| format!("failed to write {}", dest.display()))?;

    info!(
        "wrote {} bytes ({} in) to {}",
        module.bytes().len(),
        wasm.len(),
        dest.display()
    );
    Ok(())
}
