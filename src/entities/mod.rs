pub mod pedido;
