// Copyright (c) Studydesk.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

use clap::{crate_version, Arg, Command};

pub fn build_cli() -> Command {
    Command::new("studydesk")
        .about("Budget and todo backend for students")
        .version(crate_version!())
        .subcommand(Command::new("init").about("Create the database and exit"))
        .subcommand(
            Command::new("serve")
                .about("Run the HTTP API server")
                .arg(
                    Arg::new("bind")
                        .long("bind")
                        .value_name("ADDR")
                        .help("Address to listen on, e.g. 127.0.0.1:5000"),
                )
                .arg(
                    Arg::new("db")
                        .long("db")
                        .value_name("PATH")
                        .help("Database file (defaults to the platform data dir)"),
                ),
        )
        .subcommand(
            Command::new("token")
                .about("Mint a signed bearer token for a user")
                .arg(Arg::new("user").value_name("USER_ID").required(true)),
        )
}
