//! The install output (spec §3 "Game"): everything needed to actually
//! start the JVM process, plus a record of which fixes were applied.
//!
//! `spawn()` is grounded on the teacher's `minecraft/launch.rs::launch_args`
//! tail end, which builds a `tokio::process::Command` the same way; the
//! rest of that function's concerns (argument assembly, placeholder
//! substitution) now live in `arguments.rs`.

use std::path::PathBuf;

use tokio::process::{Child, Command};

use crate::error::Result;

#[derive(Debug, Clone)]
pub struct Game {
    pub id: String,
    pub jvm_executable: PathBuf,
    pub working_directory: PathBuf,
    pub main_class: String,
    pub jvm_args: Vec<String>,
    pub game_args: Vec<String>,
    /// Names of fixes (spec §4.8) applied while assembling this install,
    /// in application order.
    pub applied_fixes: Vec<&'static str>,
}

impl Game {
    /// The full argv this install would run, jvm args first then the main
    /// class then game args, matching spec §4.7's assembly order.
    pub fn command_line(&self) -> Vec<String> {
        let mut argv = self.jvm_args.clone();
        argv.push(self.main_class.clone());
        argv.extend(self.game_args.clone());
        argv
    }

    /// Spawns the game process. Does not wait for it to exit; callers own
    /// the returned `Child`.
    pub fn spawn(&self) -> Result<Child> {
        Ok(Command::new(&self.jvm_executable)
            .args(&self.jvm_args)
            .arg(&self.main_class)
            .args(&self.game_args)
            .current_dir(&self.working_directory)
            .spawn()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Game {
        Game {
            id: "1.20.1".to_string(),
            jvm_executable: PathBuf::from("/usr/bin/java"),
            working_directory: PathBuf::from("/work"),
            main_class: "net.minecraft.client.main.Main".to_string(),
            jvm_args: vec!["-Xmx2G".to_string()],
            game_args: vec!["--username".to_string(), "Steve".to_string()],
            applied_fixes: vec!["legacy_merge_sort"],
        }
    }

    #[test]
    fn command_line_orders_jvm_args_then_main_class_then_game_args() {
        let game = sample();
        assert_eq!(
            game.command_line(),
            vec![
                "-Xmx2G",
                "net.minecraft.client.main.Main",
                "--username",
                "Steve",
            ]
        );
    }
}
