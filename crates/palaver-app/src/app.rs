//! The terminal shell: a route loop with the guard applied on every
//! navigation, and one prompt-driven view per route.

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

use palaver_client::ApiClient;
use palaver_session::{Access, Route, SessionGuard, SessionStore};

use crate::chat::{ChatController, ChatError};
use crate::flows;

enum Flow {
    Goto(Route),
    Quit,
}

type Input = Lines<BufReader<Stdin>>;

pub async fn run(client: ApiClient, store: SessionStore) -> Result<()> {
    let mut input = BufReader::new(tokio::io::stdin()).lines();
    let mut route = Route::Login;

    loop {
        let flow = match SessionGuard::new(&store).check(route) {
            Access::Redirect(next) => {
                route = next;
                continue;
            }
            Access::Granted(session) => {
                let bot_avatar = flows::ensure_bot_avatar(&store);
                let controller = ChatController::new(client.clone(), session, bot_avatar);
                chat_view(controller, &store, &mut input).await?
            }
            Access::Continue => match route {
                Route::Login => login_view(&client, &store, &mut input).await?,
                Route::Register => register_view(&client, &mut input).await?,
                // the guard never lets an unauthenticated caller continue
                // into the chat
                Route::Chat => Flow::Goto(Route::Login),
            },
        };
        match flow {
            Flow::Goto(next) => route = next,
            Flow::Quit => break,
        }
    }
    Ok(())
}

async fn login_view(client: &ApiClient, store: &SessionStore, input: &mut Input) -> Result<Flow> {
    println!();
    println!("== Sign in ==  (/register to create an account, /quit to exit)");
    let Some(username) = prompt(input, "username: ").await? else {
        return Ok(Flow::Quit);
    };
    match username.as_str() {
        "/quit" => return Ok(Flow::Quit),
        "/register" => return Ok(Flow::Goto(Route::Register)),
        _ => {}
    }
    let Some(password) = prompt(input, "password: ").await? else {
        return Ok(Flow::Quit);
    };

    match flows::login(client, store, &username, &password).await {
        Ok(session) => {
            println!("Welcome back, {}.", session.username);
            Ok(Flow::Goto(Route::Chat))
        }
        Err(err) => {
            println!("{err}");
            Ok(Flow::Goto(Route::Login))
        }
    }
}

async fn register_view(client: &ApiClient, input: &mut Input) -> Result<Flow> {
    println!();
    println!("== Create an account ==  (/quit to exit)");
    let Some(username) = prompt(input, "username: ").await? else {
        return Ok(Flow::Quit);
    };
    if username == "/quit" {
        return Ok(Flow::Quit);
    }
    let Some(password) = prompt(input, "password: ").await? else {
        return Ok(Flow::Quit);
    };
    let Some(email) = prompt(input, "email: ").await? else {
        return Ok(Flow::Quit);
    };

    match flows::register(client, &username, &password, &email).await {
        Ok(avatar) => {
            println!("Account created (avatar {avatar}). Sign in to continue.");
        }
        Err(err) => {
            println!("{err}");
        }
    }
    Ok(Flow::Goto(Route::Login))
}

async fn chat_view(
    mut controller: ChatController,
    store: &SessionStore,
    input: &mut Input,
) -> Result<Flow> {
    if let Err(err) = controller.load().await {
        println!("{err}");
    }

    println!();
    println!(
        "== Chat ==  signed in as {} ({})",
        controller.session().username,
        controller.session().avatar_url
    );
    println!("commands: /refresh, /delete <n>, /logout, /quit; anything else is sent");

    loop {
        render(&controller);
        let Some(line) = prompt(input, "> ").await? else {
            return Ok(Flow::Quit);
        };
        let line = line.trim().to_string();

        if line.is_empty() {
            continue;
        }
        if line == "/quit" {
            return Ok(Flow::Quit);
        }
        if line == "/logout" {
            let outcome = store.logout();
            println!("{}", outcome.message);
            return Ok(Flow::Goto(Route::Login));
        }
        if line == "/refresh" {
            if let Err(err) = controller.load().await {
                println!("{err}");
            }
            continue;
        }
        if let Some(arg) = line.strip_prefix("/delete ") {
            match arg.trim().parse::<usize>() {
                Ok(n) => match controller.delete(n).await {
                    Ok(()) => println!("deleted."),
                    Err(err) => println!("{err}"),
                },
                Err(_) => println!("usage: /delete <n>"),
            }
            continue;
        }

        match controller.send(&line).await {
            Ok(()) => {}
            Err(ChatError::Rejected(_)) => {
                println!("!! Message contained only disallowed content and was not sent.");
            }
            Err(err) => println!("{err}"),
        }
    }
}

fn render(controller: &ChatController) {
    let session = controller.session();
    println!();
    for (i, message) in controller.messages().iter().enumerate() {
        let mine = message.author_id == session.user_id;
        let who = if message.synthetic {
            "bot"
        } else if mine {
            session.username.as_str()
        } else {
            "other"
        };
        let marker = if controller.deletable(i) { " [/delete]" } else { "" };
        println!(
            "[{i:>3}] {} {who}: {}{marker}",
            message.created_at.format("%H:%M"),
            message.html
        );
    }
}

async fn prompt(input: &mut Input, label: &str) -> Result<Option<String>> {
    use std::io::Write;
    print!("{label}");
    std::io::stdout().flush()?;
    Ok(input.next_line().await?)
}
