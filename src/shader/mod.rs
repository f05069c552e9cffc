//! Fixed shader node topology used by every imported material.
//!
//! The graph mirrors the editor's node tree: image textures feed a
//! principled BSDF through normal-map, channel-split, detail-blend and
//! mapping helpers. Wiring for a particular shader lives in [`dispatch`].

pub mod dispatch;

use serde::{Deserialize, Serialize};

use crate::scene::ImageId;
use crate::validation::limits::IMAGE_TEXTURE_SLOTS;

/// Identity of a node in the standard topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeId {
    ImageTexture(u8),
    NormalMap,
    TextureMapSeparate,
    TextureMapRoughness,
    TextureMapMetallic,
    DetailMapping,
    DetailTexCoord,
    DetailMultiplier,
    DetailMix,
    AlphaMix,
    PbrMapping,
    PbrTexCoord,
    PbrMultiplier,
    MaterialDetails,
    DetailNormalMix,
    PrincipledBsdf,
    MaterialOutput,
}

impl NodeId {
    /// Node name as shown in the editor.
    pub fn label(&self) -> String {
        match self {
            NodeId::ImageTexture(0) => "Image Texture".to_string(),
            NodeId::ImageTexture(n) => format!("Image Texture.{:03}", n),
            NodeId::NormalMap => "Normal Map 1".to_string(),
            NodeId::TextureMapSeparate => "TxtMap Separate Color".to_string(),
            NodeId::TextureMapRoughness => "TxtMap Math 1".to_string(),
            NodeId::TextureMapMetallic => "TxtMap Math 2".to_string(),
            NodeId::DetailMapping => "Detail Mapping".to_string(),
            NodeId::DetailTexCoord => "Detail Texture Coordinate".to_string(),
            NodeId::DetailMultiplier => "Detail Multiplier".to_string(),
            NodeId::DetailMix => "Detail Mix".to_string(),
            NodeId::AlphaMix => "Blend Alpha Mix".to_string(),
            NodeId::PbrMapping => "PBRMapping".to_string(),
            NodeId::PbrTexCoord => "PBRTexture Coordinate".to_string(),
            NodeId::PbrMultiplier => "PBRMultiplier".to_string(),
            NodeId::MaterialDetails => "ksMaterial Details".to_string(),
            NodeId::DetailNormalMix => "Detail Normal Mix".to_string(),
            NodeId::PrincipledBsdf => "Principled BSDF".to_string(),
            NodeId::MaterialOutput => "Material Output".to_string(),
        }
    }
}

/// Kind of node, with the settings the editor needs to build it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    ImageTexture,
    NormalMap,
    SeparateColor,
    MathMultiply,
    Mapping,
    TextureCoordinate,
    Value,
    MixColor,
    MixFloat,
    MaterialDetailsGroup,
    PrincipledBsdf,
    MaterialOutput,
}

/// Named input or output socket. Direction is implied by the link end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Socket {
    Color,
    Alpha,
    Vector,
    Normal,
    Uv,
    Scale,
    Value,
    Factor,
    A,
    B,
    Result,
    Red,
    Green,
    Blue,
    BaseColor,
    Specular,
    Roughness,
    Metallic,
    Emission,
    Bsdf,
    Surface,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub node: NodeId,
    pub socket: Socket,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Link {
    pub from: Endpoint,
    pub to: Endpoint,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShaderNode {
    pub id: NodeId,
    pub kind: NodeKind,
    /// Editor-space position, only used for layout.
    pub location: [f32; 2],
    /// Image bound to an image-texture node.
    pub image: Option<ImageId>,
    /// Unlinked input values.
    pub defaults: Vec<(Socket, f32)>,
}

impl ShaderNode {
    fn new(id: NodeId, kind: NodeKind, location: [f32; 2]) -> Self {
        Self {
            id,
            kind,
            location,
            image: None,
            defaults: vec![],
        }
    }

    fn with_default(mut self, socket: Socket, value: f32) -> Self {
        self.defaults.push((socket, value));
        self
    }
}

/// The node tree of one material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShaderGraph {
    pub nodes: Vec<ShaderNode>,
    pub links: Vec<Link>,
}

fn standard_nodes() -> Vec<ShaderNode> {
    let mut nodes = Vec::new();
    for slot in 0..IMAGE_TEXTURE_SLOTS {
        nodes.push(ShaderNode::new(
            NodeId::ImageTexture(slot),
            NodeKind::ImageTexture,
            [-800.0, 600.0 - 300.0 * slot as f32],
        ));
    }
    nodes.push(ShaderNode::new(NodeId::NormalMap, NodeKind::NormalMap, [-300.0, -600.0]));
    nodes.push(ShaderNode::new(
        NodeId::TextureMapSeparate,
        NodeKind::SeparateColor,
        [-500.0, -200.0],
    ));
    nodes.push(
        ShaderNode::new(NodeId::TextureMapRoughness, NodeKind::MathMultiply, [-300.0, -100.0])
            .with_default(Socket::B, -1.0),
    );
    nodes.push(
        ShaderNode::new(NodeId::TextureMapMetallic, NodeKind::MathMultiply, [-300.0, -300.0])
            .with_default(Socket::B, 1.0),
    );
    nodes.push(ShaderNode::new(NodeId::DetailMapping, NodeKind::Mapping, [-1100.0, -1000.0]));
    nodes.push(ShaderNode::new(
        NodeId::DetailTexCoord,
        NodeKind::TextureCoordinate,
        [-1400.0, -1000.0],
    ));
    nodes.push(
        ShaderNode::new(NodeId::DetailMultiplier, NodeKind::Value, [-1400.0, -1300.0])
            .with_default(Socket::Value, 0.5),
    );
    nodes.push(ShaderNode::new(NodeId::DetailMix, NodeKind::MixColor, [-300.0, 500.0]));
    nodes.push(ShaderNode::new(NodeId::AlphaMix, NodeKind::MixFloat, [-300.0, 250.0]));
    nodes.push(ShaderNode::new(NodeId::PbrMapping, NodeKind::Mapping, [-1100.0, -1600.0]));
    nodes.push(ShaderNode::new(
        NodeId::PbrTexCoord,
        NodeKind::TextureCoordinate,
        [-1400.0, -1600.0],
    ));
    nodes.push(
        ShaderNode::new(NodeId::PbrMultiplier, NodeKind::Value, [-1400.0, -1900.0])
            .with_default(Socket::Value, 1.0),
    );
    nodes.push(ShaderNode::new(
        NodeId::MaterialDetails,
        NodeKind::MaterialDetailsGroup,
        [-300.0, 900.0],
    ));
    nodes.push(ShaderNode::new(NodeId::DetailNormalMix, NodeKind::MixColor, [-500.0, -800.0]));
    nodes.push(ShaderNode::new(NodeId::PrincipledBsdf, NodeKind::PrincipledBsdf, [0.0, 0.0]));
    nodes.push(ShaderNode::new(NodeId::MaterialOutput, NodeKind::MaterialOutput, [300.0, 0.0]));
    nodes
}

impl ShaderGraph {
    /// Build the standard topology: base color from the first image and
    /// the BSDF feeding the material output.
    pub fn standard() -> Self {
        let mut graph = ShaderGraph {
            nodes: standard_nodes(),
            links: vec![],
        };
        graph.link(
            NodeId::ImageTexture(0),
            Socket::Color,
            NodeId::PrincipledBsdf,
            Socket::BaseColor,
        );
        graph.link(
            NodeId::PrincipledBsdf,
            Socket::Bsdf,
            NodeId::MaterialOutput,
            Socket::Surface,
        );
        graph
    }

    pub fn node(&self, id: NodeId) -> Option<&ShaderNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut ShaderNode> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    /// Standard nodes absent from this graph.
    pub fn missing_nodes(&self) -> Vec<NodeId> {
        standard_nodes()
            .into_iter()
            .map(|n| n.id)
            .filter(|id| self.node(*id).is_none())
            .collect()
    }

    /// Add any standard node that is missing. Existing nodes and links are kept.
    pub fn ensure_topology(&mut self) -> usize {
        let mut added = 0;
        for node in standard_nodes() {
            if self.node(node.id).is_none() {
                self.nodes.push(node);
                added += 1;
            }
        }
        added
    }

    /// Connect an output to an input. An input holds at most one link, so
    /// any existing link into it is replaced.
    pub fn link(&mut self, from: NodeId, from_socket: Socket, to: NodeId, to_socket: Socket) {
        let to = Endpoint {
            node: to,
            socket: to_socket,
        };
        self.links.retain(|l| l.to != to);
        self.links.push(Link {
            from: Endpoint {
                node: from,
                socket: from_socket,
            },
            to,
        });
    }

    pub fn link_into(&self, node: NodeId, socket: Socket) -> Option<&Link> {
        self.links
            .iter()
            .find(|l| l.to.node == node && l.to.socket == socket)
    }

    pub fn is_linked(&self, from: NodeId, from_socket: Socket, to: NodeId, to_socket: Socket) -> bool {
        self.link_into(to, to_socket)
            .map(|l| l.from.node == from && l.from.socket == from_socket)
            .unwrap_or(false)
    }

    pub fn set_default(&mut self, node: NodeId, socket: Socket, value: f32) {
        if let Some(n) = self.node_mut(node) {
            match n.defaults.iter_mut().find(|(s, _)| *s == socket) {
                Some(entry) => entry.1 = value,
                None => n.defaults.push((socket, value)),
            }
        }
    }

    pub fn default_value(&self, node: NodeId, socket: Socket) -> Option<f32> {
        self.node(node)?
            .defaults
            .iter()
            .find(|(s, _)| *s == socket)
            .map(|(_, v)| *v)
    }

    /// Bind an image to a texture slot. Returns false for slots the graph lacks.
    pub fn set_image(&mut self, slot: u8, image: ImageId) -> bool {
        match self.node_mut(NodeId::ImageTexture(slot)) {
            Some(node) => {
                node.image = Some(image);
                true
            }
            None => false,
        }
    }

    pub fn image(&self, slot: u8) -> Option<ImageId> {
        self.node(NodeId::ImageTexture(slot))?.image
    }

    /// Images bound to texture slots, in slot order.
    pub fn images(&self) -> Vec<(u8, ImageId)> {
        (0..IMAGE_TEXTURE_SLOTS)
            .filter_map(|slot| self.image(slot).map(|img| (slot, img)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_topology_is_complete() {
        let graph = ShaderGraph::standard();
        assert!(graph.missing_nodes().is_empty());
        assert_eq!(graph.nodes.len(), IMAGE_TEXTURE_SLOTS as usize + 16);
        assert!(graph.is_linked(
            NodeId::ImageTexture(0),
            Socket::Color,
            NodeId::PrincipledBsdf,
            Socket::BaseColor
        ));
        assert!(graph.is_linked(
            NodeId::PrincipledBsdf,
            Socket::Bsdf,
            NodeId::MaterialOutput,
            Socket::Surface
        ));
        assert_eq!(graph.default_value(NodeId::DetailMultiplier, Socket::Value), Some(0.5));
        assert_eq!(graph.default_value(NodeId::TextureMapRoughness, Socket::B), Some(-1.0));
    }

    #[test]
    fn linking_replaces_existing_input() {
        let mut graph = ShaderGraph::standard();
        graph.link(
            NodeId::DetailMix,
            Socket::Result,
            NodeId::PrincipledBsdf,
            Socket::BaseColor,
        );
        let into_base: Vec<_> = graph
            .links
            .iter()
            .filter(|l| l.to.node == NodeId::PrincipledBsdf && l.to.socket == Socket::BaseColor)
            .collect();
        assert_eq!(into_base.len(), 1);
        assert_eq!(into_base[0].from.node, NodeId::DetailMix);
    }

    #[test]
    fn ensure_topology_restores_nodes() {
        let mut graph = ShaderGraph::standard();
        graph.nodes.retain(|n| n.id != NodeId::NormalMap);
        assert_eq!(graph.missing_nodes(), vec![NodeId::NormalMap]);
        assert_eq!(graph.ensure_topology(), 1);
        assert!(graph.missing_nodes().is_empty());
    }

    #[test]
    fn labels() {
        assert_eq!(NodeId::ImageTexture(0).label(), "Image Texture");
        assert_eq!(NodeId::ImageTexture(3).label(), "Image Texture.003");
    }
}
