//! Branches on the parsed command token to a handler that mutates the
//! registry and/or enqueues replies (spec §4.F). This is the one module
//! that knows about every other component at once: parser output in,
//! registry mutation and write-queue fan-out out.

use crate::commands::{allowed_before_registration, Command};
use crate::config::Config;
use crate::parsers::{parse_message, split_params};
use crate::registry::{ClaimNickError, Registry};
use crate::replies::{client_line, Replies};
use crate::session::{RegistrationState, SessionId};

/// What the event loop should do with the session's transport after a
/// dispatch call returns.
#[derive(Debug, PartialEq, Eq)]
pub enum PostDispatch {
    Continue,
    Close(&'static str),
}

/// Parses and dispatches one already-framed, already UTF-8-decoded line for
/// session `id`. Returns whether the event loop should keep the connection
/// open.
pub fn dispatch(registry: &mut Registry, config: &Config, id: SessionId, line: &str) -> PostDispatch {
    let parsed = parse_message(line);
    let command = Command::from_parsed(&parsed);

    let now = registry.now();
    if let Some(session) = registry.session_mut(id) {
        session.touch_activity(now);
    }

    let registered = registry
        .session(id)
        .map(|s| s.is_registered())
        .unwrap_or(false);

    if !registered && !allowed_before_registration(command.token()) {
        reply_not_registered(registry, config, id);
        return PostDispatch::Continue;
    }

    match command {
        Command::Nick { params } => handle_nick(registry, config, id, &params),
        Command::User { params } => handle_user(registry, config, id, &params),
        Command::Join { params } => handle_join(registry, config, id, &params),
        Command::Part { params } => handle_part(registry, config, id, &params),
        Command::Who { params } => handle_who(registry, config, id, &params),
        Command::Privmsg { params } => handle_privmsg(registry, config, id, &params),
        Command::Ping { params } => handle_ping(registry, config, id, &params),
        Command::Pong => handle_pong(registry, id),
        Command::Quit { params } => handle_quit(registry, config, id, &params),
        Command::Unknown { command } => handle_unknown(registry, config, id, &command),
    }
}

fn reply(registry: &mut Registry, id: SessionId, line: String) {
    if let Some(session) = registry.session_mut(id) {
        session.enqueue(line);
    }
}

fn reply_not_registered(registry: &mut Registry, config: &Config, id: SessionId) {
    let nick = current_nick(registry, id);
    let r = Replies::new(&config.server.name);
    reply(registry, id, r.err_not_registered(&nick));
}

fn current_nick(registry: &Registry, id: SessionId) -> String {
    registry
        .session(id)
        .and_then(|s| s.nick.clone())
        .unwrap_or_default()
}

fn handle_nick(registry: &mut Registry, config: &Config, id: SessionId, params: &str) -> PostDispatch {
    let r = Replies::new(&config.server.name);
    let nick_arg = params.trim();
    match registry.claim_nick(id, nick_arg) {
        Ok(()) => {}
        Err(ClaimNickError::Empty) => reply(registry, id, r.err_no_nickname_given()),
        Err(ClaimNickError::TooLong)
        | Err(ClaimNickError::BadFirstChar)
        | Err(ClaimNickError::BadChar)
        | Err(ClaimNickError::AlreadyNicked) => {
            reply(registry, id, r.err_erroneus_nickname(nick_arg.trim()))
        }
        Err(ClaimNickError::InUse) => reply(registry, id, r.err_nickname_in_use(nick_arg.trim())),
    }
    PostDispatch::Continue
}

fn handle_user(registry: &mut Registry, config: &Config, id: SessionId, params: &str) -> PostDispatch {
    let r = Replies::new(&config.server.name);
    let tokens = split_params(params, 4);

    if tokens.len() < 3 {
        reply(registry, id, r.err_need_more_params());
        return PostDispatch::Continue;
    }

    let already_registered = registry
        .session(id)
        .map(|s| s.user.is_some())
        .unwrap_or(false);
    if already_registered {
        reply(registry, id, r.err_already_registered());
        return PostDispatch::Continue;
    }

    let username = tokens[0].clone();
    let realname = tokens.last().cloned().unwrap_or_default();

    let (host, nick) = {
        let session = match registry.session_mut(id) {
            Some(s) => s,
            None => return PostDispatch::Continue,
        };
        session.user = Some(username);
        session.realname = Some(realname);
        session.state = RegistrationState::Registered;
        (session.host.clone(), session.nick.clone().unwrap_or_default())
    };

    let user = registry.session(id).and_then(|s| s.user.clone()).unwrap_or_default();
    send_welcome_burst(registry, config, id, &nick, &user, &host);
    PostDispatch::Continue
}

fn send_welcome_burst(
    registry: &mut Registry,
    config: &Config,
    id: SessionId,
    nick: &str,
    user: &str,
    host: &str,
) {
    let r = Replies::new(&config.server.name);
    let n_users = registry.session_count();
    reply(registry, id, r.welcome(nick, user, host));
    reply(registry, id, r.your_host(nick, &config.server.name, &config.server.version));
    reply(registry, id, r.created(nick));
    reply(
        registry,
        id,
        r.my_info(nick, &config.server.name, &config.server.version),
    );
    reply(registry, id, r.luser_client(nick, n_users));

    if config.server.motd.is_empty() {
        reply(registry, id, r.no_motd(nick));
    } else {
        reply(registry, id, r.motd_start(nick, &config.server.name));
        reply(registry, id, r.motd(nick, &config.server.motd));
        reply(registry, id, r.end_of_motd(nick));
    }
}

fn first_target_token(params: &str) -> Option<&str> {
    let first = params.split_whitespace().next()?;
    first.split(',').next()
}

fn handle_join(registry: &mut Registry, config: &Config, id: SessionId, params: &str) -> PostDispatch {
    let r = Replies::new(&config.server.name);
    let Some(target) = first_target_token(params) else {
        reply(registry, id, r.err_need_more_params());
        return PostDispatch::Continue;
    };
    let channel_name = target.strip_prefix('#').unwrap_or(target).to_string();

    registry.add_to_channel(id, &channel_name);

    let (nick, user, host) = match registry.session(id) {
        Some(s) => (
            s.nick.clone().unwrap_or_default(),
            s.user.clone().unwrap_or_default(),
            s.host.clone(),
        ),
        None => return PostDispatch::Continue,
    };

    // Broadcast JOIN to every member including self (SPEC_FULL.md §D.3).
    let members: Vec<String> = registry
        .channel(&channel_name)
        .map(|c| c.members.iter().cloned().collect())
        .unwrap_or_default();
    let join_line = client_line(&nick, &user, &host, &format!("JOIN #{channel_name}"));
    for member_nick in &members {
        if let Some(member_id) = registry.find_by_nick(member_nick) {
            reply(registry, member_id, join_line.clone());
        }
    }

    let topic = registry
        .channel(&channel_name)
        .map(|c| c.topic.clone())
        .unwrap_or_default();
    if topic.is_empty() {
        reply(registry, id, r.no_topic(&nick, &channel_name));
    } else {
        reply(registry, id, r.topic(&nick, &channel_name, &topic));
    }

    let names = registry
        .channel(&channel_name)
        .map(|c| c.names_list())
        .unwrap_or_default();
    reply(registry, id, r.names_reply(&nick, &channel_name, &names));
    reply(registry, id, r.end_of_names(&nick, &channel_name));

    PostDispatch::Continue
}

fn handle_part(registry: &mut Registry, config: &Config, id: SessionId, params: &str) -> PostDispatch {
    let r = Replies::new(&config.server.name);
    let trimmed = params.trim();
    if trimmed.is_empty() {
        reply(registry, id, r.err_need_more_params());
        return PostDispatch::Continue;
    }

    let (targets_part, _rest) = match trimmed.split_once(' ') {
        Some((t, rest)) => (t, rest),
        None => (trimmed, ""),
    };

    let (nick, user, host) = match registry.session(id) {
        Some(s) => (
            s.nick.clone().unwrap_or_default(),
            s.user.clone().unwrap_or_default(),
            s.host.clone(),
        ),
        None => return PostDispatch::Continue,
    };

    for raw_target in targets_part.split(',') {
        let channel_name = raw_target.strip_prefix('#').unwrap_or(raw_target).to_string();

        if !registry.channel_exists(&channel_name) {
            reply(registry, id, r.err_no_such_channel(&format!("#{channel_name}")));
            break;
        }

        let is_member = registry
            .channel(&channel_name)
            .map(|c| c.members.contains(&nick))
            .unwrap_or(false);
        if !is_member {
            reply(registry, id, r.err_not_on_channel(&format!("#{channel_name}")));
            continue;
        }

        let members: Vec<String> = registry
            .channel(&channel_name)
            .map(|c| c.members.iter().cloned().collect())
            .unwrap_or_default();
        let part_line = client_line(&nick, &user, &host, &format!("PART #{channel_name}"));
        for member_nick in &members {
            if let Some(member_id) = registry.find_by_nick(member_nick) {
                reply(registry, member_id, part_line.clone());
            }
        }

        registry.remove_from_channel(id, &channel_name);
    }

    PostDispatch::Continue
}

fn handle_who(registry: &mut Registry, config: &Config, id: SessionId, params: &str) -> PostDispatch {
    let r = Replies::new(&config.server.name);
    let target = params.trim();
    let channel_name = target.strip_prefix('#').unwrap_or(target).to_string();

    let nick = current_nick(registry, id);
    let members: Vec<String> = registry
        .channel(&channel_name)
        .map(|c| c.members.iter().cloned().collect())
        .unwrap_or_default();

    for member_nick in &members {
        if let Some(member_id) = registry.find_by_nick(member_nick) {
            let (member_user, member_host, member_real) = registry
                .session(member_id)
                .map(|s| {
                    (
                        s.user.clone().unwrap_or_default(),
                        s.host.clone(),
                        s.realname.clone().unwrap_or_default(),
                    )
                })
                .unwrap_or_default();
            reply(
                registry,
                id,
                r.who_reply(
                    member_nick,
                    &channel_name,
                    &member_user,
                    &member_host,
                    &config.server.name,
                    &member_real,
                ),
            );
        }
    }
    reply(registry, id, r.end_of_who(&nick));
    PostDispatch::Continue
}

fn handle_privmsg(registry: &mut Registry, config: &Config, id: SessionId, params: &str) -> PostDispatch {
    let r = Replies::new(&config.server.name);
    if params.is_empty() {
        reply(registry, id, r.err_need_more_params());
        return PostDispatch::Continue;
    }

    // Do not blanket-trim before this split: `parse_message` preserves a
    // second leading space as the signal for an empty target parameter
    // (e.g. `PRIVMSG  :hi` parses to params `" :hi"`), and trimming it away
    // here would make `target` unable to ever come out empty.
    let (target, rest) = match params.split_once(' ') {
        Some((t, rest)) => (t, rest),
        None => (params, ""),
    };

    if target.is_empty() {
        reply(registry, id, r.err_no_recipient());
        return PostDispatch::Continue;
    }

    let rest = rest.trim_start();
    let Some(text) = rest.strip_prefix(':') else {
        reply(registry, id, r.err_no_text_to_send());
        return PostDispatch::Continue;
    };

    let (nick, user, host) = match registry.session(id) {
        Some(s) => (
            s.nick.clone().unwrap_or_default(),
            s.user.clone().unwrap_or_default(),
            s.host.clone(),
        ),
        None => return PostDispatch::Continue,
    };

    if let Some(channel_name) = target.strip_prefix('#') {
        let channel_name = channel_name.to_string();
        if !registry.channel_exists(&channel_name) {
            reply(registry, id, r.err_no_such_channel(target));
            return PostDispatch::Continue;
        }
        let members: Vec<String> = registry
            .channel(&channel_name)
            .map(|c| c.members.iter().cloned().collect())
            .unwrap_or_default();
        let line = client_line(&nick, &user, &host, &format!("PRIVMSG #{channel_name} :{text}"));
        for member_nick in &members {
            if member_nick == &nick {
                continue;
            }
            if let Some(member_id) = registry.find_by_nick(member_nick) {
                reply(registry, member_id, line.clone());
            }
        }
    } else {
        match registry.find_by_nick(target) {
            Some(target_id) => {
                let line = client_line(&nick, &user, &host, &format!("PRIVMSG {target} :{text}"));
                reply(registry, target_id, line);
            }
            None => reply(registry, id, r.err_no_such_nick(target)),
        }
    }

    PostDispatch::Continue
}

fn handle_ping(registry: &mut Registry, config: &Config, id: SessionId, params: &str) -> PostDispatch {
    let r = Replies::new(&config.server.name);
    let token = params.trim();
    if token.is_empty() {
        reply(registry, id, r.err_need_more_params());
        return PostDispatch::Continue;
    }
    let token = token.strip_prefix(':').unwrap_or(token);
    reply(
        registry,
        id,
        crate::replies::server_line(&config.server.name, &format!("PONG {token}")),
    );
    PostDispatch::Continue
}

fn handle_pong(registry: &mut Registry, id: SessionId) -> PostDispatch {
    if let Some(session) = registry.session_mut(id) {
        session.ping_pending = false;
    }
    PostDispatch::Continue
}

fn handle_quit(registry: &mut Registry, _config: &Config, id: SessionId, params: &str) -> PostDispatch {
    let reason = params
        .trim()
        .strip_prefix(':')
        .unwrap_or(params.trim())
        .to_string();
    let reason = if reason.is_empty() {
        "Client Quit".to_string()
    } else {
        reason
    };

    let (nick, user, host) = match registry.session(id) {
        Some(s) => (
            s.nick.clone().unwrap_or_default(),
            s.user.clone().unwrap_or_default(),
            s.host.clone(),
        ),
        None => return PostDispatch::Close("quit"),
    };

    let peers = registry.channel_peers(id);
    let quit_line = client_line(&nick, &user, &host, &format!("QUIT :{reason}"));
    for peer_id in peers {
        reply(registry, peer_id, quit_line.clone());
    }

    registry.detach(id);
    PostDispatch::Close("quit")
}

fn handle_unknown(registry: &mut Registry, config: &Config, id: SessionId, command: &str) -> PostDispatch {
    let r = Replies::new(&config.server.name);
    reply(registry, id, r.err_unknown_command(command));
    PostDispatch::Continue
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;
    use std::time::Instant;

    fn attach(registry: &mut Registry, id: SessionId) {
        registry.attach(Session::new(id, "host.example".into(), 1234, Instant::now()));
    }

    fn outbox(registry: &mut Registry, id: SessionId) -> String {
        registry.session_mut(id).unwrap().drain_outbox()
    }

    fn register(registry: &mut Registry, config: &Config, id: SessionId, nick: &str) {
        dispatch(registry, config, id, &format!("NICK {nick}"));
        dispatch(
            registry,
            config,
            id,
            &format!("USER {nick} 0 * :{nick} Realname"),
        );
        outbox(registry, id);
    }

    #[test]
    fn welcome_burst_order() {
        let mut registry = Registry::new();
        let config = Config::default();
        attach(&mut registry, 1);
        dispatch(&mut registry, &config, 1, "NICK alice");
        dispatch(&mut registry, &config, 1, "USER alice 0 * :Alice A");
        let out = outbox(&mut registry, 1);
        for marker in ["001", "002", "003", "004", "251", "375", "372", "376"] {
            assert!(out.contains(marker), "missing {marker} in {out}");
        }
        let pos = |m: &str| out.find(m).unwrap();
        assert!(pos("001") < pos("002"));
        assert!(pos("002") < pos("003"));
        assert!(pos("003") < pos("004"));
        assert!(pos("004") < pos("251"));
        assert!(pos("251") < pos("375"));
        assert!(pos("375") < pos("372"));
        assert!(pos("372") < pos("376"));
    }

    #[test]
    fn second_user_command_yields_462_and_no_state_change() {
        let mut registry = Registry::new();
        let config = Config::default();
        attach(&mut registry, 1);
        register(&mut registry, &config, 1, "alice");
        dispatch(&mut registry, &config, 1, "USER alice 0 * :Alice A");
        let out = outbox(&mut registry, 1);
        assert_eq!(out.matches("462").count(), 1);
    }

    #[test]
    fn duplicate_nickname_scenario() {
        let mut registry = Registry::new();
        let config = Config::default();
        attach(&mut registry, 1);
        attach(&mut registry, 2);
        dispatch(&mut registry, &config, 1, "NICK bob");
        outbox(&mut registry, 1);
        dispatch(&mut registry, &config, 2, "NICK BOB");
        let out = outbox(&mut registry, 2);
        assert_eq!(out, ":LudServer 433 BOB:Nickname is already in use\r\n");
    }

    #[test]
    fn join_and_names_scenario() {
        let mut registry = Registry::new();
        let config = Config::default();
        attach(&mut registry, 1);
        register(&mut registry, &config, 1, "alice");

        dispatch(&mut registry, &config, 1, "JOIN #room");
        let out = outbox(&mut registry, 1);
        assert!(out.contains(":alice!alice@host.example JOIN #room\r\n"));
        assert!(out.contains("331"));
        assert!(out.contains("353 alice = #room :alice\r\n"));
        assert!(out.contains("366"));

        attach(&mut registry, 2);
        register(&mut registry, &config, 2, "bob");
        dispatch(&mut registry, &config, 2, "JOIN #room");

        let alice_saw = outbox(&mut registry, 1);
        assert!(alice_saw.contains(":bob!bob@host.example JOIN #room\r\n"));

        let bob_saw = outbox(&mut registry, 2);
        assert!(bob_saw.contains("353 bob = #room :alice bob\r\n"));
    }

    #[test]
    fn channel_privmsg_fans_out_excluding_sender() {
        let mut registry = Registry::new();
        let config = Config::default();
        attach(&mut registry, 1);
        attach(&mut registry, 2);
        register(&mut registry, &config, 1, "alice");
        register(&mut registry, &config, 2, "bob");
        dispatch(&mut registry, &config, 1, "JOIN #room");
        outbox(&mut registry, 1);
        dispatch(&mut registry, &config, 2, "JOIN #room");
        outbox(&mut registry, 1);
        outbox(&mut registry, 2);

        dispatch(&mut registry, &config, 1, "PRIVMSG #room :hello");
        let bob_saw = outbox(&mut registry, 2);
        assert_eq!(bob_saw, ":alice!alice@host.example PRIVMSG #room :hello\r\n");
        let alice_saw = outbox(&mut registry, 1);
        assert_eq!(alice_saw, "");
    }

    #[test]
    fn privmsg_with_empty_recipient_gets_411() {
        let mut registry = Registry::new();
        let config = Config::default();
        attach(&mut registry, 1);
        register(&mut registry, &config, 1, "alice");

        // Raw line carries two spaces after the command: parse_message
        // collapses only one, leaving params = " :hi" so the first
        // whitespace-split token (the target) is empty.
        dispatch(&mut registry, &config, 1, "PRIVMSG  :hi");
        let out = outbox(&mut registry, 1);
        assert_eq!(out, ":LudServer 411 :No recipient given\r\n");
    }

    #[test]
    fn privmsg_with_no_params_gets_461() {
        let mut registry = Registry::new();
        let config = Config::default();
        attach(&mut registry, 1);
        register(&mut registry, &config, 1, "alice");

        dispatch(&mut registry, &config, 1, "PRIVMSG");
        let out = outbox(&mut registry, 1);
        assert_eq!(out, ":LudServer 461 :Not enough parameters\r\n");
    }

    #[test]
    fn part_deletes_empty_channel_and_rejoin_is_fresh() {
        let mut registry = Registry::new();
        let config = Config::default();
        attach(&mut registry, 1);
        register(&mut registry, &config, 1, "alice");
        dispatch(&mut registry, &config, 1, "JOIN #room");
        outbox(&mut registry, 1);

        dispatch(&mut registry, &config, 1, "PART #room");
        assert!(!registry.channel_exists("room"));

        attach(&mut registry, 2);
        register(&mut registry, &config, 2, "carol");
        dispatch(&mut registry, &config, 2, "JOIN #room");
        let out = outbox(&mut registry, 2);
        assert!(out.contains("331")); // fresh channel, no topic
    }

    #[test]
    fn unregistered_session_is_gated() {
        let mut registry = Registry::new();
        let config = Config::default();
        attach(&mut registry, 1);
        dispatch(&mut registry, &config, 1, "JOIN #room");
        let out = outbox(&mut registry, 1);
        assert!(out.contains("451"));
    }

    #[test]
    fn quit_deduplicates_across_shared_channels() {
        let mut registry = Registry::new();
        let config = Config::default();
        attach(&mut registry, 1);
        attach(&mut registry, 2);
        register(&mut registry, &config, 1, "alice");
        register(&mut registry, &config, 2, "bob");
        dispatch(&mut registry, &config, 1, "JOIN #room1");
        dispatch(&mut registry, &config, 1, "JOIN #room2");
        dispatch(&mut registry, &config, 2, "JOIN #room1");
        dispatch(&mut registry, &config, 2, "JOIN #room2");
        outbox(&mut registry, 1);
        outbox(&mut registry, 2);

        let outcome = dispatch(&mut registry, &config, 1, "QUIT :bye");
        assert_eq!(outcome, PostDispatch::Close("quit"));
        let bob_saw = outbox(&mut registry, 2);
        assert_eq!(bob_saw.matches("QUIT").count(), 1);
        assert!(registry.session(1).is_none());
    }

    #[test]
    fn unknown_command_gets_421() {
        let mut registry = Registry::new();
        let config = Config::default();
        attach(&mut registry, 1);
        register(&mut registry, &config, 1, "alice");
        dispatch(&mut registry, &config, 1, "FROB abc");
        let out = outbox(&mut registry, 1);
        assert_eq!(out, ":LudServer 421 FROB :Unknown command\r\n");
    }
}
