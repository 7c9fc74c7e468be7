use crate::ChannelError;
use async_trait::async_trait;
use futures::channel::mpsc;
use futures::SinkExt;

/// A sender of messages of type `M`
///
/// Stages and handles never hold their peers directly: they are given boxed
/// senders at assembly time, so each of them can be exercised against a mock
/// receiver.
#[async_trait]
pub trait Sender<M>: 'static + Send + Sync {
    /// Send a message to the receiver,
    /// returning an error if the receiver has been dropped
    async fn send(&mut self, message: M) -> Result<(), ChannelError>;

    /// Clone this sender so the same receiver can be fed from another task
    fn sender_clone(&self) -> DynSender<M>;
}

pub type DynSender<M> = Box<dyn Sender<M>>;

impl<M: 'static> Clone for DynSender<M> {
    fn clone(&self) -> Self {
        self.sender_clone()
    }
}

/// An `mpsc::Sender<M>` is a `Sender<N>` provided `N` implements `Into<M>`,
/// letting a single mailbox receive several kinds of messages
#[async_trait]
impl<M, N> Sender<N> for mpsc::Sender<M>
where
    M: Send + 'static,
    N: Send + 'static + Into<M>,
{
    async fn send(&mut self, message: N) -> Result<(), ChannelError> {
        Ok(SinkExt::send(self, message.into()).await?)
    }

    fn sender_clone(&self) -> DynSender<N> {
        Box::new(self.clone())
    }
}

#[async_trait]
impl<M, N> Sender<N> for mpsc::UnboundedSender<M>
where
    M: Send + 'static,
    N: Send + 'static + Into<M>,
{
    async fn send(&mut self, message: N) -> Result<(), ChannelError> {
        Ok(SinkExt::send(self, message.into()).await?)
    }

    fn sender_clone(&self) -> DynSender<N> {
        Box::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[derive(Clone, Debug, Eq, PartialEq)]
    pub struct Msg1 {}

    #[derive(Clone, Debug, Eq, PartialEq)]
    pub struct Msg2 {}

    #[derive(Clone, Debug, Eq, PartialEq)]
    pub enum Msg {
        Msg1(Msg1),
        Msg2(Msg2),
    }

    impl From<Msg1> for Msg {
        fn from(m: Msg1) -> Msg {
            Msg::Msg1(m)
        }
    }

    impl From<Msg2> for Msg {
        fn from(m: Msg2) -> Msg {
            Msg::Msg2(m)
        }
    }

    #[tokio::test]
    async fn a_sender_adapts_sub_messages() {
        let (sender, receiver) = mpsc::channel::<Msg>(10);

        {
            let mut sender_msg1: DynSender<Msg1> = sender.sender_clone();
            let mut sender_msg2: DynSender<Msg2> = sender.sender_clone();
            let mut sender = sender;

            Sender::send(&mut sender, Msg::Msg1(Msg1 {}))
                .await
                .expect("enough room in the mailbox");
            sender_msg1
                .send(Msg1 {})
                .await
                .expect("enough room in the mailbox");
            sender_msg2
                .send(Msg2 {})
                .await
                .expect("enough room in the mailbox");
        }

        assert_eq!(
            receiver.collect::<Vec<_>>().await,
            vec![Msg::Msg1(Msg1 {}), Msg::Msg1(Msg1 {}), Msg::Msg2(Msg2 {})]
        )
    }

    #[tokio::test]
    async fn sending_fails_when_the_receiver_is_dropped() {
        let (sender, receiver) = mpsc::channel::<Msg>(10);
        drop(receiver);

        let mut sender: DynSender<Msg1> = sender.sender_clone();
        let result = sender.send(Msg1 {}).await;
        assert!(matches!(result, Err(ChannelError::SendError(_))));
    }
}
