//! Interactive shell
//!
//! A line-reading loop over the dispatcher: split on whitespace, lowercase
//! the command word, dispatch under the interactive profile, print the
//! result. The `exit` command comes back as a distinct outcome and is the
//! only way out of the loop.

use dialoguer::theme::ColorfulTheme;
use dialoguer::Input;

use crate::commands::{CommandOutcome, Dispatcher, ExposureProfile};

pub fn run_shell(dispatcher: &Dispatcher) {
    println!("padctl: type 'help' for commands.");
    loop {
        let line: String = match Input::with_theme(&ColorfulTheme::default())
            .with_prompt(">")
            .allow_empty(true)
            .interact_text()
        {
            Ok(line) => line,
            Err(e) => {
                log::error!("Prompt read failed: {}", e);
                break;
            }
        };

        let mut parts = line.split_whitespace();
        let Some(command) = parts.next() else {
            continue;
        };
        let command = command.to_lowercase();
        let args: Vec<String> = parts.map(str::to_string).collect();

        match dispatcher.dispatch(&command, &args, ExposureProfile::Interactive) {
            Ok(CommandOutcome::Success { message }) => {
                if !message.is_empty() {
                    println!("{}", message);
                }
            }
            Ok(CommandOutcome::Terminate) => {
                log::info!("Exit requested from shell");
                break;
            }
            Err(e) => println!("{}", e),
        }
    }
}
