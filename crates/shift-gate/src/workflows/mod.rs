pub mod shiftcheck;
