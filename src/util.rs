//! Utility module, a grab-bag of functionality

use metric;
use std::sync::mpsc;

/// A vector of channel senders, one per configured sink.
///
/// The senders are rendezvous-style: a send completes only when the sink
/// has taken the event, so a snapshot is never sitting in a queue growing
/// stale. Sinks that cannot keep up are a configuration problem, not a
/// memory problem.
pub type Channel = Vec<mpsc::SyncSender<metric::Event>>;

/// Send a `metric::Event` into a `Channel`.
///
/// The event is cloned for every sender past the first. A send can only
/// fail when the receiving sink has hung up; that sink is beyond caring, so
/// the failure is logged and the event dropped.
pub fn send(chans: &mut Channel, event: metric::Event) {
    let max: usize = chans.len().saturating_sub(1);
    if max == 0 {
        if chans[0].send(event).is_err() {
            error!("receiver has hung up, dropping event");
        }
    } else {
        for chan in &mut chans[1..] {
            if chan.send(event.clone()).is_err() {
                error!("receiver has hung up, dropping event");
            }
        }
        if chans[0].send(event).is_err() {
            error!("receiver has hung up, dropping event");
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use metric;
    use std::sync::mpsc;

    #[test]
    fn send_fans_out_to_every_receiver() {
        let (snd_a, recv_a) = mpsc::sync_channel(1);
        let (snd_b, recv_b) = mpsc::sync_channel(1);
        let mut chans: Channel = vec![snd_a, snd_b];

        send(&mut chans, metric::Event::Shutdown);

        assert!(match recv_a.recv().unwrap() {
            metric::Event::Shutdown => true,
            _ => false,
        });
        assert!(match recv_b.recv().unwrap() {
            metric::Event::Shutdown => true,
            _ => false,
        });
    }

    #[test]
    fn send_survives_a_hung_up_receiver() {
        let (snd_a, recv_a) = mpsc::sync_channel(1);
        let (snd_b, recv_b) = mpsc::sync_channel(1);
        drop(recv_b);
        let mut chans: Channel = vec![snd_a, snd_b];

        send(&mut chans, metric::Event::Shutdown);

        assert!(recv_a.recv().is_ok());
    }
}
