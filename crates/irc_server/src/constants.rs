//! Numeric reply codes and their fixed string components (RFC 2812 vocabulary,
//! restricted to the subset this server actually sends; see replies.rs for
//! the full payload templates).

pub const RPL_WELCOME_NB: u16 = 1;
pub const RPL_YOURHOST_NB: u16 = 2;
pub const RPL_CREATED_NB: u16 = 3;
pub const RPL_MYINFO_NB: u16 = 4;
pub const RPL_LUSERCLIENT_NB: u16 = 251;
pub const RPL_ENDOFWHO_NB: u16 = 315;
pub const RPL_NOTOPIC_NB: u16 = 331;
pub const RPL_TOPIC_NB: u16 = 332;
pub const RPL_WHOREPLY_NB: u16 = 352;
pub const RPL_NAMREPLY_NB: u16 = 353;
pub const RPL_ENDOFNAMES_NB: u16 = 366;
pub const RPL_MOTD_NB: u16 = 372;
pub const RPL_MOTDSTART_NB: u16 = 375;
pub const RPL_ENDOFMOTD_NB: u16 = 376;

pub const ERR_NOSUCHNICK_NB: u16 = 401;
pub const ERR_NOSUCHCHANNEL_NB: u16 = 403;
pub const ERR_NORECIPIENT_NB: u16 = 411;
pub const ERR_NOTEXTTOSEND_NB: u16 = 412;
pub const ERR_UNKNOWNCOMMAND_NB: u16 = 421;
pub const ERR_NOMOTD_NB: u16 = 422;
pub const ERR_NONICKNAMEGIVEN_NB: u16 = 431;
pub const ERR_ERRONEUSNICKNAME_NB: u16 = 432;
pub const ERR_NICKNAMEINUSE_NB: u16 = 433;
pub const ERR_NOTONCHANNEL_NB: u16 = 442;
pub const ERR_NOTREGISTERED_NB: u16 = 451;
pub const ERR_NEEDMOREPARAMS_NB: u16 = 461;
pub const ERR_ALREADYREGISTRED_NB: u16 = 462;

pub const ERR_UNKNOWNCOMMAND_STR: &str = "Unknown command";
pub const ERR_NEEDMOREPARAMS_STR: &str = "Not enough parameters";

/// Nicknames may not start with any of these (spec §4.F NICK contract).
pub const NICK_FORBIDDEN_FIRST_CHARS: &[char] = &['$', ':', '#', '&'];

/// Nicknames may not contain any of these anywhere.
pub const NICK_FORBIDDEN_CHARS: &[char] = &[' ', ',', '!', '?', '@', '*', '.'];

pub const MAX_NICK_LEN: usize = 9;

/// Bytes read per socket readiness event (§4.G step 4).
pub const READ_CHUNK_SIZE: usize = 1024;

/// Listener backlog (§6).
pub const LISTEN_BACKLOG: u32 = 5;

/// Poll timeout per event-loop iteration (§4.G step 3).
pub const POLL_TIMEOUT_SECS: u64 = 20;

/// Liveness sweep thresholds (§4.G step 6).
pub const IDLE_PING_THRESHOLD_SECS: u64 = 90;
pub const PING_TIMEOUT_SECS: u64 = 15;

pub const PING_TOKEN: &str = "Aliveness check";
