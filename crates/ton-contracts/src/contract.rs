//! Address binding shared by every contract facade.

use std::sync::Arc;

use ton_cell::{Cell, CellBuilder, MsgAddress};
use tracing::{debug, trace};

use crate::error::{ContractError, ContractResult};
use crate::init::ContractInit;
use crate::settings::ContractSettings;
use crate::stack::{GetMethodSpec, StackValue};
use crate::transport::{ContractTransport, OutgoingMessage};

/// Builder with the `opcode:uint32 query_id:uint64` header every operation
/// body starts with. A missing query id is written as 0.
pub fn begin_message(opcode: u32, query_id: Option<u64>) -> ContractResult<CellBuilder> {
    let mut builder = CellBuilder::new();
    builder.store_u32(opcode)?;
    builder.store_u64(query_id.unwrap_or(0))?;
    Ok(builder)
}

/// A contract address, optionally with the code and data it is (or will
/// be) deployed from, plus the settings used for messages sent to it.
#[derive(Debug, Clone)]
pub struct ContractBinding {
    address: MsgAddress,
    init: Option<ContractInit>,
    settings: ContractSettings,
}

impl ContractBinding {
    /// Bind to an already deployed contract.
    pub fn new(address: MsgAddress, settings: ContractSettings) -> Self {
        Self {
            address,
            init: None,
            settings,
        }
    }

    /// Bind to the address derived from `init` in the configured workchain.
    pub fn from_init(init: ContractInit, settings: ContractSettings) -> ContractResult<Self> {
        let address = init.address(settings.workchain)?;
        Ok(Self {
            address,
            init: Some(init),
            settings,
        })
    }

    /// Contract address.
    pub fn address(&self) -> &MsgAddress {
        &self.address
    }

    /// User-friendly address rendered with the configured flags.
    pub fn friendly_address(&self) -> Option<String> {
        let settings = &self.settings;
        self.address
            .to_user_friendly(settings.bounceable, settings.testnet)
    }

    /// Code and data, if known.
    pub fn init(&self) -> Option<&ContractInit> {
        self.init.as_ref()
    }

    /// Settings used for outgoing messages.
    pub fn settings(&self) -> &ContractSettings {
        &self.settings
    }

    /// Message carrying `body` and `value` to this contract.
    pub fn message(&self, value: u128, body: Cell) -> OutgoingMessage {
        OutgoingMessage {
            destination: self.address.clone(),
            value,
            body: Arc::new(body),
            state_init: None,
            bounce: self.settings.bounceable,
            mode: self.settings.send_mode,
        }
    }

    /// Deployment message: empty body with the state init attached.
    pub fn deploy_message(&self, value: u128) -> ContractResult<OutgoingMessage> {
        let init = self
            .init
            .as_ref()
            .ok_or(ContractError::MissingField("state_init"))?;
        let mut message = self.message(value, Cell::empty());
        message.state_init = Some(Arc::new(init.state_init()?));
        Ok(message)
    }

    /// Submit a message through the transport.
    pub async fn send(
        &self,
        transport: &dyn ContractTransport,
        message: OutgoingMessage,
    ) -> ContractResult<()> {
        debug!(
            "Sending to {}: value={} opcode={:?} body={} bits/{} refs state_init={} mode={}",
            message.destination,
            message.value,
            message.opcode(),
            message.body.bit_len(),
            message.body.reference_count(),
            message.state_init.is_some(),
            message.mode
        );
        transport.send_internal_message(message).await?;
        Ok(())
    }

    /// Submit `body` with `value` attached.
    pub async fn send_body(
        &self,
        transport: &dyn ContractTransport,
        value: u128,
        body: Cell,
    ) -> ContractResult<()> {
        self.send(transport, self.message(value, body)).await
    }

    /// Encode a deployment message and submit it.
    pub async fn send_deploy(
        &self,
        transport: &dyn ContractTransport,
        value: u128,
    ) -> ContractResult<()> {
        let message = self.deploy_message(value)?;
        self.send(transport, message).await
    }

    /// Run a get-method and check the returned stack against its signature.
    pub async fn run_get_method(
        &self,
        transport: &dyn ContractTransport,
        spec: &GetMethodSpec,
        args: &[StackValue],
    ) -> ContractResult<Vec<StackValue>> {
        debug!(
            "Running {} on {} with {} args",
            spec.name,
            self.address,
            args.len()
        );
        let stack = transport
            .run_get_method(&self.address, spec.name, args)
            .await?;
        trace!("{} returned {} stack entries", spec.name, stack.len());

        spec.check(&stack)?;
        Ok(stack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::settings::SendMode;
    use crate::stack::{StackField, StackType};
    use crate::transport::{InMemoryTransport, TransportError};

    const GET_COUNT: GetMethodSpec = GetMethodSpec {
        name: "get_count",
        args: &[],
        returns: &[StackField::new("count", StackType::Int)],
    };

    fn code_and_data() -> ContractInit {
        let mut code = CellBuilder::new();
        code.store_u32(0xC0DE).unwrap();
        let mut data = CellBuilder::new();
        data.store_u32(0xDA7A).unwrap();
        ContractInit::new(
            Arc::new(code.build().unwrap()),
            Arc::new(data.build().unwrap()),
        )
    }

    #[test]
    fn test_begin_message_header() {
        let cell = begin_message(7, None).unwrap().build().unwrap();
        assert_eq!(cell.bit_len(), 96);
        assert_eq!(cell.data(), &[0, 0, 0, 7, 0, 0, 0, 0, 0, 0, 0, 0]);

        let cell = begin_message(7, Some(0x0102)).unwrap().build().unwrap();
        assert_eq!(&cell.data()[10..], &[0x01, 0x02]);
    }

    #[test]
    fn test_from_init_uses_settings_workchain() {
        let settings = ContractSettings {
            workchain: -1,
            ..ContractSettings::default()
        };
        let binding = ContractBinding::from_init(code_and_data(), settings).unwrap();
        assert_eq!(binding.address().workchain(), Some(-1));
        assert!(binding.friendly_address().unwrap().starts_with("Ef"));
    }

    #[test]
    fn test_message_uses_settings() {
        let settings = ContractSettings {
            bounceable: false,
            send_mode: SendMode::CARRY_REMAINING_VALUE,
            ..ContractSettings::default()
        };
        let binding = ContractBinding::new(MsgAddress::internal(0, [1; 32]), settings);
        let message = binding.message(10, Cell::empty());
        assert!(!message.bounce);
        assert_eq!(message.mode, SendMode::CARRY_REMAINING_VALUE);
        assert!(message.state_init.is_none());
    }

    #[test]
    fn test_deploy_requires_init() {
        let binding =
            ContractBinding::new(MsgAddress::internal(0, [1; 32]), ContractSettings::default());
        assert!(matches!(
            binding.deploy_message(1),
            Err(ContractError::MissingField("state_init"))
        ));
    }

    #[tokio::test]
    async fn test_send_deploy() {
        let transport = InMemoryTransport::new();
        let init = code_and_data();
        let binding = ContractBinding::from_init(init.clone(), ContractSettings::default()).unwrap();

        binding.send_deploy(&transport, 50_000_000).await.unwrap();

        let sent = transport.sent_messages().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].body.bit_len(), 0);
        let state_init = sent[0].state_init.as_ref().unwrap();
        assert_eq!(state_init.hash(), init.state_init().unwrap().hash());
        assert_eq!(
            sent[0].destination.hash_part(),
            Some(&state_init.hash())
        );
    }

    #[tokio::test]
    async fn test_run_get_method_checks_stack() {
        let transport = InMemoryTransport::new();
        let binding =
            ContractBinding::new(MsgAddress::internal(0, [1; 32]), ContractSettings::default());

        transport
            .set_result(binding.address(), "get_count", vec![StackValue::Null])
            .await;
        assert!(matches!(
            binding.run_get_method(&transport, &GET_COUNT, &[]).await,
            Err(ContractError::StackTypeMismatch { position: 0, .. })
        ));

        transport
            .set_result(binding.address(), "get_count", vec![StackValue::int(3)])
            .await;
        let stack = binding.run_get_method(&transport, &GET_COUNT, &[]).await.unwrap();
        assert_eq!(stack, vec![StackValue::int(3)]);
    }

    #[tokio::test]
    async fn test_transport_error_propagates() {
        let transport = InMemoryTransport::new();
        let binding =
            ContractBinding::new(MsgAddress::internal(0, [1; 32]), ContractSettings::default());
        assert!(matches!(
            binding.run_get_method(&transport, &GET_COUNT, &[]).await,
            Err(ContractError::Transport(TransportError::NotDeployed(_)))
        ));
    }
}
