use core::panic;
use cucumber::{gherkin::Step, given, then, when, World};
use log::{debug, info};
use std::process::Command;

#[derive(Debug, Default, World)]
pub struct CliWorld {
    command_output: Option<String>,
    command_stderr: Option<String>,
    command_status: Option<i32>,
    home: Option<tempfile::TempDir>,
}

#[given(regex = "no GitHub token is configured")]
async fn no_github_token_is_configured(world: &mut CliWorld) {
    world.home = Some(tempfile::tempdir().expect("Failed to create a temporary HOME"));
}

#[when(regex = "the following command is run:")]
async fn run_command(world: &mut CliWorld, step: &Step) {
    let raw_command = step.docstring().unwrap();
    let parts = raw_command.split_whitespace().collect::<Vec<&str>>();
    assert!(!parts.is_empty(), "No command provided");
    let mut args: Vec<&str> = parts[1..].to_vec();
    let executable = if parts[0] == "gh-repo-create" {
        args.insert(0, "--");
        args.insert(0, "--quiet");
        args.insert(0, "run");
        "cargo"
    } else {
        parts[0]
    };

    let mut command = Command::new(executable);
    command.args(&args);
    if let Some(home) = &world.home {
        command.env("HOME", home.path()).env_remove("GH_TOKEN");
    }

    match command.output() {
        Ok(output) => {
            let stdout = String::from_utf8(output.stdout).unwrap();
            world.command_output = Some(stdout);
            let stderr = String::from_utf8(output.stderr).unwrap();
            world.command_stderr = Some(stderr);
            world.command_status = output.status.code();
        }
        Err(e) => {
            panic!("Failed to run command: {}", e);
        }
    }
}

// The docstring comes through wrapped in newlines
fn docstring(step: &Step) -> &str {
    step.docstring().unwrap().trim_matches('\n')
}

#[then(expr = "it should exit with status code {int}")]
async fn it_should_exit_with_status(world: &mut CliWorld, status: i32) {
    debug!("status: {:?}", status);
    assert_eq!(world.command_status, Some(status));
}

#[then(expr = "the output should contain:")]
async fn the_output_should_contain(world: &mut CliWorld, step: &Step) {
    assert!(world.command_output.is_some());
    let expected_output = docstring(step);
    let actual_output = world.command_output.as_ref().unwrap();
    assert!(
        actual_output.contains(expected_output),
        "{actual_output:?} does not contain {expected_output:?}"
    );
}

#[then(expr = "stderr should contain:")]
async fn stderr_should_contain(world: &mut CliWorld, step: &Step) {
    assert!(world.command_stderr.is_some());
    let expected_stderr = docstring(step);
    let actual_stderr = world.command_stderr.as_ref().unwrap();
    assert!(
        actual_stderr.contains(expected_stderr),
        "{actual_stderr:?} does not contain {expected_stderr:?}"
    );
}

#[tokio::main]
async fn main() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Trace)
        .format_target(false)
        .format_timestamp_secs()
        .target(env_logger::Target::Stdout)
        .init();
    info!("cargo build");
    Command::new("cargo")
        .args(["build", "--quiet"])
        .status()
        .expect("Failed to build");
    info!("Running CLI tests");

    CliWorld::cucumber()
        .run_and_exit("features/cli.feature")
        .await;
}
