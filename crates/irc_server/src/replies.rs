//! Canonical outbound line formatting (spec §4.C, §6 reply table).
//!
//! Server-originated replies are sourced `:<server.name>`; client-originated
//! broadcasts (JOIN/PART/QUIT/PRIVMSG) are sourced `:<nick>!<user>@<host>`.
//! No further escaping is applied — callers already embed the `:` trailing
//! sigil where the template calls for one.

use crate::constants::*;

/// A fully-addressed line ready to append to a write queue, terminated with
/// CRLF.
pub fn server_line(server_name: &str, body: &str) -> String {
    format!(":{server_name} {body}\r\n")
}

pub fn client_line(nick: &str, user: &str, host: &str, body: &str) -> String {
    format!(":{nick}!{user}@{host} {body}\r\n")
}

pub struct Replies<'a> {
    pub server_name: &'a str,
}

impl<'a> Replies<'a> {
    pub fn new(server_name: &'a str) -> Self {
        Replies { server_name }
    }

    fn num(&self, numeric: u16, rest: &str) -> String {
        server_line(self.server_name, &format!("{numeric:03} {rest}"))
    }

    pub fn welcome(&self, nick: &str, user: &str, host: &str) -> String {
        self.num(
            RPL_WELCOME_NB,
            &format!("{nick} :Welcome to the IRC!:{nick}!{user}@{host}"),
        )
    }

    pub fn your_host(&self, nick: &str, servername: &str, version: &str) -> String {
        self.num(
            RPL_YOURHOST_NB,
            &format!("{nick} :Your host is {servername} running version {version}"),
        )
    }

    pub fn created(&self, nick: &str) -> String {
        self.num(RPL_CREATED_NB, &format!("{nick} :This server was created sometime."))
    }

    pub fn my_info(&self, nick: &str, servername: &str, version: &str) -> String {
        self.num(RPL_MYINFO_NB, &format!("{nick} {servername} {version} o o"))
    }

    pub fn luser_client(&self, nick: &str, n_users: usize) -> String {
        self.num(
            RPL_LUSERCLIENT_NB,
            &format!("{nick} :There are {n_users} users and 0 services on 1 servers"),
        )
    }

    pub fn motd_start(&self, nick: &str, servername: &str) -> String {
        self.num(RPL_MOTDSTART_NB, &format!("{nick} :- {servername} Message of the day -"))
    }

    pub fn motd(&self, nick: &str, line: &str) -> String {
        self.num(RPL_MOTD_NB, &format!("{nick} :- {line}"))
    }

    pub fn end_of_motd(&self, nick: &str) -> String {
        self.num(RPL_ENDOFMOTD_NB, &format!("{nick} :End of MOTD command"))
    }

    pub fn no_motd(&self, nick: &str) -> String {
        self.num(ERR_NOMOTD_NB, &format!("{nick} :MOTD file is missing"))
    }

    pub fn no_topic(&self, nick: &str, channel: &str) -> String {
        self.num(RPL_NOTOPIC_NB, &format!("{nick} #{channel} :No topic is set"))
    }

    pub fn topic(&self, nick: &str, channel: &str, topic: &str) -> String {
        self.num(RPL_TOPIC_NB, &format!("{nick} #{channel} :{topic}"))
    }

    pub fn names_reply(&self, nick: &str, channel: &str, names: &str) -> String {
        self.num(RPL_NAMREPLY_NB, &format!("{nick} = #{channel} :{names}"))
    }

    pub fn end_of_names(&self, nick: &str, channel: &str) -> String {
        self.num(RPL_ENDOFNAMES_NB, &format!("{nick} #{channel} :End of NAMES list"))
    }

    pub fn who_reply(
        &self,
        nick: &str,
        channel: &str,
        user: &str,
        host: &str,
        server_host: &str,
        realname: &str,
    ) -> String {
        self.num(
            RPL_WHOREPLY_NB,
            &format!("{nick} #{channel} {user} {host} {server_host} {nick} H :0 {realname}"),
        )
    }

    pub fn end_of_who(&self, nick: &str) -> String {
        self.num(RPL_ENDOFWHO_NB, &format!("{nick} :End of WHO list"))
    }

    pub fn err_no_such_nick(&self, target: &str) -> String {
        self.num(ERR_NOSUCHNICK_NB, &format!("{target} :No such nick/channel"))
    }

    pub fn err_no_such_channel(&self, target: &str) -> String {
        self.num(ERR_NOSUCHCHANNEL_NB, &format!("{target} :No such channel"))
    }

    pub fn err_no_recipient(&self) -> String {
        self.num(ERR_NORECIPIENT_NB, ":No recipient given")
    }

    pub fn err_no_text_to_send(&self) -> String {
        self.num(ERR_NOTEXTTOSEND_NB, ":No text to send")
    }

    pub fn err_unknown_command(&self, command: &str) -> String {
        self.num(ERR_UNKNOWNCOMMAND_NB, &format!("{command} :{ERR_UNKNOWNCOMMAND_STR}"))
    }

    pub fn err_no_motd(&self, nick: &str) -> String {
        self.no_motd(nick)
    }

    pub fn err_no_nickname_given(&self) -> String {
        self.num(ERR_NONICKNAMEGIVEN_NB, ":No nickname given")
    }

    pub fn err_erroneus_nickname(&self, nick: &str) -> String {
        self.num(ERR_ERRONEUSNICKNAME_NB, &format!("{nick}:Erroneus nickname"))
    }

    pub fn err_nickname_in_use(&self, nick: &str) -> String {
        self.num(ERR_NICKNAMEINUSE_NB, &format!("{nick}:Nickname is already in use"))
    }

    pub fn err_not_on_channel(&self, target: &str) -> String {
        self.num(ERR_NOTONCHANNEL_NB, &format!("{target} :You're not on that channel"))
    }

    pub fn err_not_registered(&self, nick: &str) -> String {
        self.num(ERR_NOTREGISTERED_NB, &format!("{nick} :Not registered"))
    }

    pub fn err_need_more_params(&self) -> String {
        self.num(ERR_NEEDMOREPARAMS_NB, &format!(":{ERR_NEEDMOREPARAMS_STR}"))
    }

    pub fn err_already_registered(&self) -> String {
        self.num(
            ERR_ALREADYREGISTRED_NB,
            ":Unauthorized command (already registered)",
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn welcome_matches_template() {
        let r = Replies::new("LudServer");
        assert_eq!(
            r.welcome("alice", "alice", "host.example"),
            ":LudServer 001 alice :Welcome to the IRC!:alice!alice@host.example\r\n"
        );
    }

    #[test]
    fn nickname_in_use_matches_template() {
        let r = Replies::new("LudServer");
        assert_eq!(
            r.err_nickname_in_use("BOB"),
            ":LudServer 433 BOB:Nickname is already in use\r\n"
        );
    }

    #[test]
    fn client_line_sources_from_nick_user_host() {
        let line = client_line("alice", "alice", "host.example", "JOIN #room");
        assert_eq!(line, ":alice!alice@host.example JOIN #room\r\n");
    }
}
