//! A small checker for XML files, in the manner of `xmllint`.

use std::{
    fs,
    io::{Write, stdout},
    process::ExitCode,
};

use anyhow::Context as _;
use clap::Parser;
use tracing::{debug, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;
#[cfg(feature = "xpath")]
use xmlbind::{XmlError, xpath::XPathValue};
use xmlbind::{
    Diagnostic, Document, ParseOptions, SaveOptions, XmlParserOption, collect, node_count,
    parse_bytes, valid::RootNameValidator,
};

// Error codes, numbered like the return codes of xmllint.
const RETURN_OK: u8 = 0; // No error
const ERR_UNCLASS: u8 = 1; // Unclassified
const ERR_VALID: u8 = 3; // Validation error
const ERR_RDFILE: u8 = 4; // Read or parse error
#[cfg(feature = "xpath")]
const ERR_XPATH: u8 = 10; // XPath evaluation error

#[derive(Parser, Debug)]
#[command(version, name = "xmlbind-lint", arg_required_else_help = true)]
struct CmdArgs {
    #[clap(required = true)]
    xml_files: Vec<String>,
    /// output what was parsable on broken XML documents
    #[arg(long)]
    recover: bool,
    /// remove any internal arbitrary parser limits
    #[arg(long)]
    huge: bool,
    /// remove redundant namespace declarations
    #[arg(long)]
    nsclean: bool,
    /// replace cdata section with text nodes
    #[arg(long)]
    nocdata: bool,
    /// drop ignorable blank spaces
    #[arg(long)]
    noblanks: bool,
    /// do not emit warnings from parser
    #[arg(long)]
    nowarning: bool,
    /// ignore any encoding specified inside the document
    #[arg(long)]
    noenc: bool,
    /// don't output the result tree
    #[arg(long)]
    noout: bool,
    /// reformat/reindent the output
    #[arg(long)]
    format: bool,
    /// output in the given encoding
    #[arg(long, value_name = "encoding")]
    encode: Option<String>,
    /// check that the root element is the one declared by the schema
    #[arg(long, value_name = "schema")]
    schema: Option<String>,
    #[cfg(feature = "xpath")]
    /// evaluate the XPath expression, imply --noout
    #[arg(long, value_name = "expr")]
    xpath: Option<String>,
    /// print the number of live nodes once the documents are released
    #[arg(long)]
    stats: bool,
    /// log the internals of the library
    #[arg(long)]
    debug: bool,
}

impl CmdArgs {
    fn parse_options(&self) -> ParseOptions {
        let flags = [
            (self.recover, XmlParserOption::XmlParseRecover),
            (self.huge, XmlParserOption::XmlParseHuge),
            (self.nsclean, XmlParserOption::XmlParseNsclean),
            (self.nocdata, XmlParserOption::XmlParseNocdata),
            (self.noblanks, XmlParserOption::XmlParseNoblanks),
            (self.nowarning, XmlParserOption::XmlParseNowarning),
            (self.noenc, XmlParserOption::XmlParseIgnoreEnc),
        ];
        flags
            .into_iter()
            .filter(|&(set, _)| set)
            .fold(ParseOptions::default(), |options, (_, flag)| options.with(flag))
    }

    #[cfg(feature = "xpath")]
    fn has_xpath(&self) -> bool {
        self.xpath.is_some()
    }

    #[cfg(not(feature = "xpath"))]
    fn has_xpath(&self) -> bool {
        false
    }
}

fn load(path: &str, options: &ParseOptions) -> anyhow::Result<Document> {
    let bytes = fs::read(path).with_context(|| format!("failed to load \"{path}\""))?;
    let options = ParseOptions {
        base_url: Some(path.to_owned()),
        ..options.clone()
    };
    Ok(parse_bytes(&bytes, &options)?)
}

fn print_diagnostic(diag: &Diagnostic) {
    if diag.message.ends_with('\n') {
        eprint!("{diag}");
    } else {
        eprintln!("{diag}");
    }
}

#[cfg(feature = "xpath")]
fn print_xpath(doc: &Document, expr: &str) -> Result<(), XmlError> {
    match doc.eval(expr)? {
        XPathValue::NodeSet(nodes) if nodes.is_empty() => println!("XPath set is empty"),
        XPathValue::NodeSet(nodes) => {
            for node in nodes {
                println!("{node}");
            }
        }
        XPathValue::Boolean(b) => println!("{b}"),
        XPathValue::Number(n) => println!("{n}"),
        XPathValue::String(s) => println!("{s}"),
    }
    Ok(())
}

fn process(args: &CmdArgs, path: &str, schema: Option<&Document>) -> anyhow::Result<u8> {
    let options = args.parse_options();
    let doc = match load(path, &options) {
        Ok(doc) => doc,
        Err(err) => {
            eprintln!("{path}: {err:#}");
            return Ok(ERR_RDFILE);
        }
    };
    for diag in doc.errors() {
        print_diagnostic(&diag);
    }

    let mut code = RETURN_OK;
    if let Some(schema) = schema {
        if doc.validate(Some(schema), &RootNameValidator)? {
            eprintln!("{path} validates");
        } else {
            for diag in doc.validation_errors() {
                print_diagnostic(&diag);
            }
            eprintln!("{path} fails to validate");
            code = ERR_VALID;
        }
    }

    #[cfg(feature = "xpath")]
    if let Some(expr) = args.xpath.as_deref() {
        if let Err(err) = print_xpath(&doc, expr) {
            eprintln!("{err}");
            return Ok(ERR_XPATH);
        }
    }

    if !args.noout && !args.has_xpath() {
        let save = SaveOptions {
            format: args.format,
            encoding: args.encode.clone(),
            ..Default::default()
        };
        let bytes = doc.to_bytes(&save)?;
        stdout()
            .write_all(&bytes)
            .context("failed to write the document")?;
    }
    debug!(path, nodes = doc.node_count(), "processed");
    Ok(code)
}

fn run(args: &CmdArgs) -> anyhow::Result<u8> {
    let schema = match args.schema.as_deref() {
        Some(path) => match load(path, &ParseOptions::default()) {
            Ok(schema) => Some(schema),
            Err(err) => {
                eprintln!("{path}: {err:#}");
                return Ok(ERR_RDFILE);
            }
        },
        None => None,
    };
    let mut code = RETURN_OK;
    for path in &args.xml_files {
        let ret = process(args, path, schema.as_ref())?;
        if code == RETURN_OK {
            code = ret;
        }
    }
    drop(schema);
    if args.stats {
        collect();
        eprintln!("live nodes: {}", node_count());
    }
    Ok(code)
}

fn main() -> ExitCode {
    let args = CmdArgs::parse();
    let default = if args.debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::WARN
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::builder()
                .with_default_directive(default.into())
                .from_env_lossy(),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(&args) {
        Ok(code) => ExitCode::from(code),
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::from(ERR_UNCLASS)
        }
    }
}
