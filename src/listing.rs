//! Endpoint listing and inspection output.

use std::io::{self, Write};

use serde::Serialize;

use crate::spec::Spec;

/// One line per path in document order, or with `verbose`, the path's
/// methods followed by one `METHOD summary` line each.
pub fn list_endpoints<W: Write + ?Sized>(spec: &Spec, verbose: bool, out: &mut W) -> io::Result<()> {
    for (path, item) in &spec.paths {
        if !verbose {
            writeln!(out, "{path}")?;
            continue;
        }

        let methods = item.methods();
        let upper: Vec<String> = methods.iter().map(|method| method.to_uppercase()).collect();
        writeln!(out, "{path} ({})", upper.join(", "))?;
        for (method, label) in methods.iter().zip(&upper) {
            let summary = item.operations[*method].summary.as_deref().unwrap_or("");
            writeln!(out, "  {label:<6} {summary}")?;
        }
    }
    Ok(())
}

/// Print the definition of `path`, or of a single operation under it when
/// `method` is given. Unknown paths and methods produce a message, not an
/// error.
pub fn show_endpoint<W: Write + ?Sized>(
    spec: &Spec,
    path: &str,
    method: Option<&str>,
    out: &mut W,
) -> io::Result<()> {
    let Some(item) = spec.path(path) else {
        return writeln!(out, "Endpoint {path} not found");
    };

    let Some(method) = method else {
        return pretty_print(item, out);
    };

    match item.operation(method) {
        Some(operation) => pretty_print(operation, out),
        None => {
            let available: Vec<String> = item.methods().iter().map(|m| m.to_uppercase()).collect();
            writeln!(
                out,
                "Method {} not found for {path}. Available: {}",
                method.to_uppercase(),
                available.join(", ")
            )
        }
    }
}

fn pretty_print<T: Serialize, W: Write + ?Sized>(value: &T, out: &mut W) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)
}
