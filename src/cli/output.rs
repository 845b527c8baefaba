use crate::modules::{ModuleDocumentation, ModuleError, ModuleResult};

/// The result document for a module error, in the same shape as a
/// successful run
pub fn failure_result(error: &ModuleError) -> ModuleResult {
    ModuleResult::failure(error.to_string())
}

pub fn render_result(result: &ModuleResult) -> String {
    serde_json::to_string_pretty(result)
        .unwrap_or_else(|e| format!(r#"{{"failed": true, "msg": "unable to render result: {e}"}}"#))
}

pub fn print_result(result: &ModuleResult) {
    println!("{}", render_result(result));
}

pub fn print_module_list(names: &[&str]) {
    for name in names {
        println!("{name}");
    }
}

pub fn print_documentation(name: &str, doc: &ModuleDocumentation) {
    println!("{name}");
    println!("{}", "=".repeat(name.len()));
    println!();
    println!("{}", doc.description);
    println!();

    println!("Arguments:");
    for arg in &doc.arguments {
        let mut flags = Vec::new();
        if arg.required {
            flags.push("required".to_string());
        }
        if let Some(default) = &arg.default {
            flags.push(format!("default: {default}"));
        }
        let flags = if flags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", flags.join(", "))
        };
        println!("  {} ({}){}", arg.name, arg.argument_type, flags);
        println!("      {}", arg.description);
    }

    if !doc.return_values.is_empty() {
        println!();
        println!("Returns:");
        for ret in &doc.return_values {
            println!("  {} ({}, {})", ret.name, ret.value_type, ret.returned);
            println!("      {}", ret.description);
        }
    }

    for example in &doc.examples {
        println!();
        println!("Example:");
        for line in example.lines() {
            println!("  {line}");
        }
    }
}
