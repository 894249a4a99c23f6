//! `Sync` handlers, keyed `<className>_<functionName>`. Argument 0 is the
//! object name.

use quasselwire_types::{MessageInfo, SemanticValue};

use crate::dispatch::{Args, DispatchTable};
use crate::error::DispatchError;
use crate::event::Event;

type Result<T> = std::result::Result<T, DispatchError>;

pub fn table() -> DispatchTable<Event> {
    DispatchTable::new("sync")
        .on("BufferSyncer_setMarkerLine", marker_line)
        .on("BufferViewConfig_addBuffer", add_buffer)
        .on("BufferViewConfig_removeBuffer", remove_buffer)
        .on(
            "BufferViewConfig_removeBufferPermanently",
            remove_buffer_permanently,
        )
        .on("BacklogManager_receiveBacklog", receive_backlog)
        .on("Network_setLatency", latency)
        .on("Network_addIrcChannel", add_channel)
        .on("Network_addIrcUser", add_user)
        .on("IrcChannel_addUserMode", add_user_mode)
        .on("IrcChannel_removeUserMode", remove_user_mode)
        .on("IrcChannel_setTopic", topic)
        .on("IrcChannel_joinIrcUsers", join_users)
        .on("IrcUser_partChannel", part_channel)
        .on("IrcUser_quit", quit)
        .on("IrcUser_setNick", set_nick)
        .on("IrcUser_setAway", set_away)
        .on("IrcUser_setServer", set_server)
        .on("IrcUser_setRealName", set_real_name)
        .on("IrcUser_setHost", set_host)
        .on("IrcUser_setUser", set_user)
        .on_unknown(|args| Err(super::unhandled("sync", args)))
}

fn marker_line(args: &Args<'_>) -> Result<Event> {
    Ok(Event::MarkerUpdated {
        buffer_id: args.int(1)?,
        message_id: args.int(2)?,
    })
}

fn add_buffer(args: &Args<'_>) -> Result<Event> {
    Ok(Event::BufferAdded {
        buffer_view_id: args.numeric_name(0)?,
        buffer_id: args.int(1)?,
        index: args.int(2)?,
    })
}

fn removed(args: &Args<'_>, permanent: bool) -> Result<Event> {
    Ok(Event::BufferRemoved {
        buffer_view_id: args.numeric_name(0)?,
        buffer_id: args.int(1)?,
        permanent,
    })
}

fn remove_buffer(args: &Args<'_>) -> Result<Event> {
    removed(args, false)
}

fn remove_buffer_permanently(args: &Args<'_>) -> Result<Event> {
    removed(args, true)
}

// (objectName, bufferId, first, last, limit, additional, messages)
fn receive_backlog(args: &Args<'_>) -> Result<Event> {
    let mut messages = args
        .list(6)?
        .iter()
        .map(|item| match item {
            SemanticValue::Message(message) => Ok(MessageInfo::clone(message)),
            other => Err(args.bad(format!("backlog holds a {}, not a message", other.kind()))),
        })
        .collect::<Result<Vec<_>>>()?;
    // The core sends newest first.
    messages.reverse();
    Ok(Event::Backlog(messages))
}

fn latency(args: &Args<'_>) -> Result<Event> {
    Ok(Event::LatencyUpdated {
        network_id: args.numeric_name(0)?,
        latency: args.int(1)?,
    })
}

fn add_channel(args: &Args<'_>) -> Result<Event> {
    Ok(Event::ChannelJoined {
        network_id: args.numeric_name(0)?,
        buffer_name: args.text(1)?,
    })
}

fn add_user(args: &Args<'_>) -> Result<Event> {
    Ok(Event::UserConnected {
        network_id: args.numeric_name(0)?,
        host: args.text(1)?,
    })
}

fn add_user_mode(args: &Args<'_>) -> Result<Event> {
    let channel = args.object_id(0)?;
    Ok(Event::UserModeAdded {
        network_id: channel.network_id,
        buffer_name: channel.name,
        nickname: args.text(1)?,
        mode: args.text(2)?,
    })
}

fn remove_user_mode(args: &Args<'_>) -> Result<Event> {
    let channel = args.object_id(0)?;
    Ok(Event::UserModeRemoved {
        network_id: channel.network_id,
        buffer_name: channel.name,
        nickname: args.text(1)?,
        mode: args.text(2)?,
    })
}

fn topic(args: &Args<'_>) -> Result<Event> {
    let channel = args.object_id(0)?;
    Ok(Event::TopicChanged {
        network_id: channel.network_id,
        buffer_name: channel.name,
        topic: args.text(1)?,
    })
}

fn join_users(args: &Args<'_>) -> Result<Event> {
    let channel = args.object_id(0)?;
    let nicknames = args.strings(1)?;
    let modes = args.strings(2)?;
    Ok(Event::UsersJoined {
        network_id: channel.network_id,
        buffer_name: channel.name,
        user_modes: nicknames.into_iter().zip(modes).collect(),
    })
}

fn part_channel(args: &Args<'_>) -> Result<Event> {
    let user = args.object_id(0)?;
    Ok(Event::UserParted {
        network_id: user.network_id,
        nickname: user.name,
        buffer_name: args.text(1)?,
    })
}

fn quit(args: &Args<'_>) -> Result<Event> {
    let user = args.object_id(0)?;
    Ok(Event::UserQuit {
        network_id: user.network_id,
        nickname: user.name,
    })
}

fn metadata(args: &Args<'_>, key: &str) -> Result<Event> {
    let user = args.object_id(0)?;
    Ok(Event::UserSetMetadata {
        network_id: user.network_id,
        nickname: user.name,
        key: key.to_string(),
        value: args.get(1)?.clone(),
    })
}

fn set_nick(args: &Args<'_>) -> Result<Event> {
    metadata(args, "nick")
}

fn set_away(args: &Args<'_>) -> Result<Event> {
    metadata(args, "away")
}

fn set_server(args: &Args<'_>) -> Result<Event> {
    metadata(args, "server")
}

fn set_real_name(args: &Args<'_>) -> Result<Event> {
    metadata(args, "realName")
}

fn set_host(args: &Args<'_>) -> Result<Event> {
    metadata(args, "host")
}

fn set_user(args: &Args<'_>) -> Result<Event> {
    metadata(args, "user")
}
