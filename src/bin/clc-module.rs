use anyhow::{bail, Result};
use clap::Parser;
use clc_modules::cli::{
    failure_result, load_args, print_documentation, print_module_list, print_result, ClcModuleCli,
    RunOptions,
};
use clc_modules::modules::{ExecutionContext, ModuleRegistry};
use tracing::{debug, error};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = ClcModuleCli::parse();
    let options = RunOptions::from(&cli);

    // stdout carries the JSON result, so logs go to stderr
    tracing_subscriber::fmt()
        .with_max_level(options.log_level())
        .with_writer(std::io::stderr)
        .init();

    let registry = ModuleRegistry::with_clc_modules();

    if cli.list {
        print_module_list(&registry.list_modules());
        return Ok(());
    }

    let Some(module_name) = cli.module.as_deref() else {
        bail!("a module name is required");
    };

    if cli.doc {
        let Some(module) = registry.get_module(module_name) else {
            bail!("Module not found: {module_name}");
        };
        print_documentation(module_name, &module.documentation());
        return Ok(());
    }

    let args = load_args(cli.args.as_deref())?;
    let environment = ExecutionContext::from_process_env().environment;
    let context = options.context(environment);
    debug!(module = %module_name, check_mode = context.check_mode, "running module");

    let result = match registry.execute_module(module_name, &args, &context).await {
        Ok(result) => result,
        Err(e) => {
            error!(module = %module_name, error = %e, "module failed");
            failure_result(&e)
        }
    };
    print_result(&result);

    if result.failed {
        std::process::exit(1);
    }
    Ok(())
}
